use crate::ids::{ProposalId, UserId, VoteId};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum VoteChoice {
    #[sea_orm(string_value = "approve")]
    Approve,
    #[sea_orm(string_value = "reject")]
    Reject,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "policy_vote")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: VoteId,
    pub proposal_id: ProposalId,
    pub user_id: UserId,
    pub vote: VoteChoice,
    pub comment: Option<String>,
    pub voted_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::policy_proposal::Entity",
        from = "Column::ProposalId",
        to = "super::policy_proposal::Column::Id"
    )]
    PolicyProposal,
}

impl Related<super::policy_proposal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PolicyProposal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
