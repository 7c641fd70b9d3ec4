use sea_orm_migration::{prelude::*, schema::*};

use super::m20260301_000003_create_journal_entries_table::JournalEntry;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EntryInteraction::Table)
                    .col(pk_uuid(EntryInteraction::Id))
                    .col(uuid(EntryInteraction::EntryId))
                    .col(uuid(EntryInteraction::UserId))
                    .col(string_len(EntryInteraction::Kind, 16))
                    .col(text_null(EntryInteraction::Content))
                    .col(timestamp_with_time_zone(EntryInteraction::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-entry-interaction-entry_id")
                            .from(EntryInteraction::Table, EntryInteraction::EntryId)
                            .to(JournalEntry::Table, JournalEntry::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_entry_interactions_entry_id")
                    .table(EntryInteraction::Table)
                    .col(EntryInteraction::EntryId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EntryInteraction::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum EntryInteraction {
    Table,
    Id,
    EntryId,
    UserId,
    Kind,
    Content,
    CreatedAt,
}
