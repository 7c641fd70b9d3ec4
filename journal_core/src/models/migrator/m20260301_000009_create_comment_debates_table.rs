use sea_orm_migration::{prelude::*, schema::*};

use super::m20260301_000008_create_flagged_comments_table::FlaggedComment;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CommentDebate::Table)
                    .col(pk_uuid(CommentDebate::Id))
                    .col(uuid_uniq(CommentDebate::FlagId))
                    .col(uuid(CommentDebate::GroupId))
                    .col(string_len(CommentDebate::Status, 8))
                    .col(text_null(CommentDebate::AdminDecision))
                    .col(string_len_null(CommentDebate::Penalty, 32))
                    .col(uuid_null(CommentDebate::DecidedBy))
                    .col(timestamp_with_time_zone_null(CommentDebate::DecidedAt))
                    .col(timestamp_with_time_zone(CommentDebate::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-comment-debate-flag_id")
                            .from(CommentDebate::Table, CommentDebate::FlagId)
                            .to(FlaggedComment::Table, FlaggedComment::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_comment_debates_group_id")
                    .table(CommentDebate::Table)
                    .col(CommentDebate::GroupId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CommentDebate::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum CommentDebate {
    Table,
    Id,
    FlagId,
    GroupId,
    Status,
    AdminDecision,
    Penalty,
    DecidedBy,
    DecidedAt,
    CreatedAt,
}
