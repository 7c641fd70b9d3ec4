use sea_orm_migration::{prelude::*, schema::*};

use super::m20260301_000001_create_groups_table::Group;
use super::m20260301_000009_create_comment_debates_table::CommentDebate;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MemberPenalty::Table)
                    .col(pk_uuid(MemberPenalty::Id))
                    .col(uuid(MemberPenalty::GroupId))
                    .col(uuid(MemberPenalty::UserId))
                    .col(string_len(MemberPenalty::PenaltyType, 8))
                    .col(integer_null(MemberPenalty::DurationDays))
                    .col(text(MemberPenalty::Reason))
                    .col(uuid(MemberPenalty::IssuedBy))
                    .col(uuid_null(MemberPenalty::DebateId))
                    .col(timestamp_with_time_zone(MemberPenalty::IssuedAt))
                    .col(timestamp_with_time_zone_null(MemberPenalty::ExpiresAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-member-penalty-group_id")
                            .from(MemberPenalty::Table, MemberPenalty::GroupId)
                            .to(Group::Table, Group::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-member-penalty-debate_id")
                            .from(MemberPenalty::Table, MemberPenalty::DebateId)
                            .to(CommentDebate::Table, CommentDebate::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Gate checks look up penalties per (group, user)
        manager
            .create_index(
                Index::create()
                    .name("idx_member_penalties_group_user")
                    .table(MemberPenalty::Table)
                    .col(MemberPenalty::GroupId)
                    .col(MemberPenalty::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MemberPenalty::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum MemberPenalty {
    Table,
    Id,
    GroupId,
    UserId,
    PenaltyType,
    DurationDays,
    Reason,
    IssuedBy,
    DebateId,
    IssuedAt,
    ExpiresAt,
}
