use crate::ids::{DebateId, FlagId, GroupId, UserId};
use crate::models::penalty::PenaltyDecision;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum DebateStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "closed")]
    Closed,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment_debate")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: DebateId,
    #[sea_orm(unique)]
    pub flag_id: FlagId,
    pub group_id: GroupId,
    pub status: DebateStatus,
    pub admin_decision: Option<String>,
    /// Encoded `PenaltyDecision`, e.g. `mute_7d`. Set on close.
    pub penalty: Option<String>,
    pub decided_by: Option<UserId>,
    pub decided_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

impl Model {
    /// The decision recorded at close, if the debate is closed.
    pub fn penalty_decision(
        &self,
    ) -> Option<Result<PenaltyDecision, crate::models::penalty::PenaltyParseError>> {
        self.penalty.as_deref().map(str::parse)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::flagged_comment::Entity",
        from = "Column::FlagId",
        to = "super::flagged_comment::Column::Id"
    )]
    FlaggedComment,
    #[sea_orm(has_many = "super::debate_message::Entity")]
    DebateMessage,
}

impl Related<super::flagged_comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FlaggedComment.def()
    }
}

impl Related<super::debate_message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DebateMessage.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
