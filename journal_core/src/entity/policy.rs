use crate::ids::{GroupId, PolicyId, UserId};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PolicyStatus {
    #[sea_orm(string_value = "active")]
    Active,
    /// At least one proposal against the policy is still pending.
    #[sea_orm(string_value = "proposed")]
    Proposed,
    #[sea_orm(string_value = "archived")]
    Archived,
}

/// A versioned community rule owned by a group.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "policy")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: PolicyId,
    pub group_id: GroupId,
    pub title: String,
    pub content: String,
    /// Starts at 1, bumped on every accepted proposal.
    pub version: i32,
    pub status: PolicyStatus,
    pub created_by: UserId,
    /// Author of the change currently in force. `None` for founding text.
    pub proposer_id: Option<UserId>,
    /// Minimum voting window any later proposal must keep.
    pub approval_days: i32,
    pub proposed_at: Option<DateTimeUtc>,
    pub approved_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id"
    )]
    Group,
    #[sea_orm(has_many = "super::policy_proposal::Entity")]
    PolicyProposal,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::policy_proposal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PolicyProposal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
