use crate::ids::{DebateId, MessageId, UserId};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "debate_message")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: MessageId,
    pub debate_id: DebateId,
    pub author_id: UserId,
    pub message: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::comment_debate::Entity",
        from = "Column::DebateId",
        to = "super::comment_debate::Column::Id"
    )]
    CommentDebate,
}

impl Related<super::comment_debate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CommentDebate.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
