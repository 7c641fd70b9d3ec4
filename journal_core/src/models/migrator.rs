use sea_orm_migration::prelude::*;

mod m20260301_000001_create_groups_table;
mod m20260301_000002_create_group_members_table;
mod m20260301_000003_create_journal_entries_table;
mod m20260301_000004_create_entry_interactions_table;
mod m20260301_000005_create_policies_table;
mod m20260301_000006_create_policy_proposals_table;
mod m20260301_000007_create_policy_votes_table;
mod m20260301_000008_create_flagged_comments_table;
mod m20260301_000009_create_comment_debates_table;
mod m20260301_000010_create_debate_messages_table;
mod m20260301_000011_create_member_penalties_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_groups_table::Migration),
            Box::new(m20260301_000002_create_group_members_table::Migration),
            Box::new(m20260301_000003_create_journal_entries_table::Migration),
            Box::new(m20260301_000004_create_entry_interactions_table::Migration),
            Box::new(m20260301_000005_create_policies_table::Migration),
            Box::new(m20260301_000006_create_policy_proposals_table::Migration),
            Box::new(m20260301_000007_create_policy_votes_table::Migration),
            Box::new(m20260301_000008_create_flagged_comments_table::Migration),
            Box::new(m20260301_000009_create_comment_debates_table::Migration),
            Box::new(m20260301_000010_create_debate_messages_table::Migration),
            Box::new(m20260301_000011_create_member_penalties_table::Migration),
        ]
    }
}

#[cfg(test)]
use sea_orm::{Database, DbErr};

#[tokio::test]
async fn test_migrations_okay() -> Result<(), DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    let schema_manager = SchemaManager::new(&db);

    Migrator::refresh(&db).await?;

    for table in [
        "group",
        "group_member",
        "journal_entry",
        "entry_interaction",
        "policy",
        "policy_proposal",
        "policy_vote",
        "flagged_comment",
        "comment_debate",
        "debate_message",
        "member_penalty",
    ] {
        assert!(schema_manager.has_table(table).await?, "missing table {table}");
    }

    Ok(())
}
