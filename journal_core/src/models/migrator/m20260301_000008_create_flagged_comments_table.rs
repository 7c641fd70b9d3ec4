use sea_orm_migration::{prelude::*, schema::*};

use super::m20260301_000001_create_groups_table::Group;
use super::m20260301_000004_create_entry_interactions_table::EntryInteraction;
use super::m20260301_000005_create_policies_table::Policy;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FlaggedComment::Table)
                    .col(pk_uuid(FlaggedComment::Id))
                    .col(uuid(FlaggedComment::GroupId))
                    .col(uuid(FlaggedComment::InteractionId))
                    .col(uuid(FlaggedComment::FlaggerId))
                    .col(uuid(FlaggedComment::CommentAuthorId))
                    .col(uuid(FlaggedComment::PolicyId))
                    .col(text(FlaggedComment::Reason))
                    .col(string_len(FlaggedComment::Status, 16))
                    .col(timestamp_with_time_zone(FlaggedComment::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-flagged-comment-group_id")
                            .from(FlaggedComment::Table, FlaggedComment::GroupId)
                            .to(Group::Table, Group::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-flagged-comment-interaction_id")
                            .from(FlaggedComment::Table, FlaggedComment::InteractionId)
                            .to(EntryInteraction::Table, EntryInteraction::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-flagged-comment-policy_id")
                            .from(FlaggedComment::Table, FlaggedComment::PolicyId)
                            .to(Policy::Table, Policy::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_flagged_comments_group_id")
                    .table(FlaggedComment::Table)
                    .col(FlaggedComment::GroupId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_flagged_comments_interaction_id")
                    .table(FlaggedComment::Table)
                    .col(FlaggedComment::InteractionId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FlaggedComment::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum FlaggedComment {
    Table,
    Id,
    GroupId,
    InteractionId,
    FlaggerId,
    CommentAuthorId,
    PolicyId,
    Reason,
    Status,
    CreatedAt,
}
