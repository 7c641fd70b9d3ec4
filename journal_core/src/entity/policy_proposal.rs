use crate::ids::{GroupId, PolicyId, ProposalId, UserId};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ChangeType {
    #[sea_orm(string_value = "edit")]
    Edit,
    #[sea_orm(string_value = "new_rule")]
    NewRule,
    #[sea_orm(string_value = "delete")]
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ProposalStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "auto_approved")]
    AutoApproved,
}

impl ProposalStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ProposalStatus::Pending)
    }

    pub fn is_accepted(self) -> bool {
        matches!(self, ProposalStatus::Approved | ProposalStatus::AutoApproved)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "policy_proposal")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: ProposalId,
    pub policy_id: PolicyId,
    pub group_id: GroupId,
    pub proposer_id: UserId,
    pub change_type: ChangeType,
    pub proposed_content: String,
    pub reason: String,
    pub approval_days: i32,
    pub status: ProposalStatus,
    pub created_at: DateTimeUtc,
    pub auto_approval_date: DateTimeUtc,
    pub resolved_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::policy::Entity",
        from = "Column::PolicyId",
        to = "super::policy::Column::Id"
    )]
    Policy,
    #[sea_orm(has_many = "super::policy_vote::Entity")]
    PolicyVote,
}

impl Related<super::policy::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Policy.def()
    }
}

impl Related<super::policy_vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PolicyVote.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
