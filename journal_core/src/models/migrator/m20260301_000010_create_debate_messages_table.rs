use sea_orm_migration::{prelude::*, schema::*};

use super::m20260301_000009_create_comment_debates_table::CommentDebate;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DebateMessage::Table)
                    .col(pk_uuid(DebateMessage::Id))
                    .col(uuid(DebateMessage::DebateId))
                    .col(uuid(DebateMessage::AuthorId))
                    .col(text(DebateMessage::Message))
                    .col(timestamp_with_time_zone(DebateMessage::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-debate-message-debate_id")
                            .from(DebateMessage::Table, DebateMessage::DebateId)
                            .to(CommentDebate::Table, CommentDebate::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Messages are read back in posting order
        manager
            .create_index(
                Index::create()
                    .name("idx_debate_messages_debate_created")
                    .table(DebateMessage::Table)
                    .col(DebateMessage::DebateId)
                    .col(DebateMessage::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DebateMessage::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum DebateMessage {
    Table,
    Id,
    DebateId,
    AuthorId,
    Message,
    CreatedAt,
}
