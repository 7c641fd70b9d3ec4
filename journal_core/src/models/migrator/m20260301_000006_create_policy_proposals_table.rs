use sea_orm_migration::{prelude::*, schema::*};

use super::m20260301_000005_create_policies_table::Policy;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PolicyProposal::Table)
                    .col(pk_uuid(PolicyProposal::Id))
                    .col(uuid(PolicyProposal::PolicyId))
                    .col(uuid(PolicyProposal::GroupId))
                    .col(uuid(PolicyProposal::ProposerId))
                    .col(string_len(PolicyProposal::ChangeType, 16))
                    .col(text(PolicyProposal::ProposedContent))
                    .col(text(PolicyProposal::Reason))
                    .col(integer(PolicyProposal::ApprovalDays))
                    .col(string_len(PolicyProposal::Status, 16))
                    .col(timestamp_with_time_zone(PolicyProposal::CreatedAt))
                    .col(timestamp_with_time_zone(PolicyProposal::AutoApprovalDate))
                    .col(timestamp_with_time_zone_null(PolicyProposal::ResolvedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-policy-proposal-policy_id")
                            .from(PolicyProposal::Table, PolicyProposal::PolicyId)
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
                    .name("idx_policy_proposals_policy_id")
                    .table(PolicyProposal::Table)
                    .col(PolicyProposal::PolicyId)
                    .to_owned(),
            )
            .await?;

        // The sweeper scans pending proposals by deadline
        manager
            .create_index(
                Index::create()
                    .name("idx_policy_proposals_status_deadline")
                    .table(PolicyProposal::Table)
                    .col(PolicyProposal::Status)
                    .col(PolicyProposal::AutoApprovalDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PolicyProposal::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum PolicyProposal {
    Table,
    Id,
    PolicyId,
    GroupId,
    ProposerId,
    ChangeType,
    ProposedContent,
    Reason,
    ApprovalDays,
    Status,
    CreatedAt,
    AutoApprovalDate,
    ResolvedAt,
}
