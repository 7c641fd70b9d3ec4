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
                    .table(JournalEntry::Table)
                    .col(pk_uuid(JournalEntry::Id))
                    .col(uuid(JournalEntry::AuthorId))
                    .col(uuid_null(JournalEntry::GroupId)) // NULL for private entries
                    .col(string(JournalEntry::Title))
                    .col(text(JournalEntry::Body))
                    .col(timestamp_with_time_zone(JournalEntry::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-journal-entry-group_id")
                            .from(JournalEntry::Table, JournalEntry::GroupId)
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
                    .name("idx_journal_entries_group_id")
                    .table(JournalEntry::Table)
                    .col(JournalEntry::GroupId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(JournalEntry::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum JournalEntry {
    Table,
    Id,
    AuthorId,
    GroupId,
    Title,
    Body,
    CreatedAt,
}
