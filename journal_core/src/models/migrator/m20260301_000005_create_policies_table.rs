use sea_orm_migration::{prelude::*, schema::*};

use super::m20260301_000001_create_groups_table::Group;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Policy::Table)
                    .col(pk_uuid(Policy::Id))
                    .col(uuid(Policy::GroupId))
                    .col(string(Policy::Title))
                    .col(text(Policy::Content))
                    .col(integer(Policy::Version))
                    .col(string_len(Policy::Status, 16))
                    .col(uuid(Policy::CreatedBy))
                    .col(uuid_null(Policy::ProposerId))
                    .col(integer(Policy::ApprovalDays))
                    .col(timestamp_with_time_zone_null(Policy::ProposedAt))
                    .col(timestamp_with_time_zone_null(Policy::ApprovedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-policy-group_id")
                            .from(Policy::Table, Policy::GroupId)
                            .to(Group::Table, Group::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_policies_group_id")
                    .table(Policy::Table)
                    .col(Policy::GroupId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Policy::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Policy {
    Table,
    Id,
    GroupId,
    Title,
    Content,
    Version,
    Status,
    CreatedBy,
    ProposerId,
    ApprovalDays,
    ProposedAt,
    ApprovedAt,
}
