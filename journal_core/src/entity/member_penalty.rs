use crate::ids::{DebateId, GroupId, PenaltyId, UserId};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
pub enum PenaltyType {
    #[sea_orm(string_value = "warning")]
    Warning,
    #[sea_orm(string_value = "mute")]
    Mute,
    #[sea_orm(string_value = "ban")]
    Ban,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "member_penalty")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: PenaltyId,
    pub group_id: GroupId,
    pub user_id: UserId,
    pub penalty_type: PenaltyType,
    /// `None` means permanent; only bans may be permanent.
    pub duration_days: Option<i32>,
    pub reason: String,
    pub issued_by: UserId,
    pub debate_id: Option<DebateId>,
    pub issued_at: DateTimeUtc,
    pub expires_at: Option<DateTimeUtc>,
}

impl Model {
    /// Expiry is derived at read time; nothing ever flips a stored flag.
    pub fn is_active(&self, now: DateTimeUtc) -> bool {
        crate::models::penalty::is_penalty_active(self.expires_at, now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id"
    )]
    Group,
    #[sea_orm(
        belongs_to = "super::comment_debate::Entity",
        from = "Column::DebateId",
        to = "super::comment_debate::Column::Id"
    )]
    CommentDebate,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::comment_debate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CommentDebate.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
