use sea_orm_migration::{prelude::*, schema::*};

use super::m20260301_000006_create_policy_proposals_table::PolicyProposal;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PolicyVote::Table)
                    .col(pk_uuid(PolicyVote::Id))
                    .col(uuid(PolicyVote::ProposalId))
                    .col(uuid(PolicyVote::UserId))
                    .col(string_len(PolicyVote::Vote, 8))
                    .col(text_null(PolicyVote::Comment))
                    .col(timestamp_with_time_zone(PolicyVote::VotedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-policy-vote-proposal_id")
                            .from(PolicyVote::Table, PolicyVote::ProposalId)
                            .to(PolicyProposal::Table, PolicyProposal::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One vote per member per proposal
        manager
            .create_index(
                Index::create()
                    .name("idx_policy_votes_proposal_user_unique")
                    .table(PolicyVote::Table)
                    .col(PolicyVote::ProposalId)
                    .col(PolicyVote::UserId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PolicyVote::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum PolicyVote {
    Table,
    Id,
    ProposalId,
    UserId,
    Vote,
    Comment,
    VotedAt,
}
