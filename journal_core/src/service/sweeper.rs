//! Periodic resolution of proposals whose deadline passed with no vote to
//! trigger them. Reads resolve lazily anyway; the sweep only makes the
//! outcome land sooner.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::{sync::watch, task::JoinHandle};

use crate::service::policies::{PoliciesService, PoliciesServiceError};

const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

pub struct ProposalSweeper {
    policies: PoliciesService,
    interval: Duration,
}

impl ProposalSweeper {
    pub fn new(policies: PoliciesService, interval: Duration) -> Self {
        Self {
            policies,
            interval: interval.max(MIN_SWEEP_INTERVAL),
        }
    }

    /// Run a single sweep, returning how many proposals were resolved.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<usize, PoliciesServiceError> {
        let resolved = self.policies._resolve_due_proposals(now).await?;
        if !resolved.is_empty() {
            tracing::info!(count = resolved.len(), "sweeper resolved proposals");
        }
        Ok(resolved.len())
    }

    /// Start sweeping in the background until the handle is stopped.
    pub fn spawn(self) -> SweeperHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        tracing::info!(interval = ?self.interval, "starting proposal sweeper");

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(error) = self.sweep_once(Utc::now()).await {
                            tracing::warn!(error = ?error, "proposal sweep failed");
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!("proposal sweeper stopped");
        });

        SweeperHandle { stop_tx, task }
    }
}

pub struct SweeperHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    pub async fn stop(self) {
        // Send fails only if the task already exited
        let _ = self.stop_tx.send(true);
        if let Err(error) = self.task.await {
            tracing::warn!(error = ?error, "proposal sweeper task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyLimits;
    use crate::entity::prelude::*;
    use crate::ids::{GroupId, PolicyId, UserId};
    use crate::models::migrator::Migrator;
    use sea_orm_migration::MigratorTrait;

    async fn setup_test_service() -> (PoliciesService, PolicyId, UserId) {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let group_id = GroupId::new();
        let admin = UserId::new();

        Group::insert(GroupActiveModel {
            id: Set(group_id),
            owner_id: Set(admin),
            name: Set("Sweep".to_string()),
            created_at: Set(Utc::now()),
        })
        .exec(&db)
        .await
        .unwrap();
        GroupMember::insert(GroupMemberActiveModel {
            group_id: Set(group_id),
            user_id: Set(admin),
            role: Set(MemberRole::Admin),
            joined_at: Set(Utc::now()),
        })
        .exec(&db)
        .await
        .unwrap();

        let policies = PoliciesService::new(db, PolicyLimits::default());
        let policy = policies
            ._create_policy(group_id, admin, "Rule".into(), "v1".into(), 7, Utc::now())
            .await
            .unwrap();

        (policies, policy.id, admin)
    }

    #[tokio::test]
    async fn test_sweep_once_resolves_only_due_proposals() {
        let (policies, policy_id, admin) = setup_test_service().await;
        let t0 = Utc::now();

        policies
            ._propose_change(policy_id, admin, ChangeType::Edit, "v2".into(), 7, "r".into(), t0)
            .await
            .unwrap();

        let sweeper = ProposalSweeper::new(policies.clone(), Duration::from_secs(60));

        assert_eq!(sweeper.sweep_once(t0 + chrono::Duration::days(6)).await.unwrap(), 0);
        assert_eq!(sweeper.sweep_once(t0 + chrono::Duration::days(7)).await.unwrap(), 1);
        assert_eq!(sweeper.sweep_once(t0 + chrono::Duration::days(8)).await.unwrap(), 0);

        let policy = policies._get_policy(policy_id).await.unwrap();
        assert_eq!(policy.content, "v2");
    }

    #[tokio::test]
    async fn test_spawned_sweeper_runs_and_stops() {
        let (policies, policy_id, admin) = setup_test_service().await;
        let long_ago = Utc::now() - chrono::Duration::days(30);

        let proposal = policies
            ._propose_change(
                policy_id,
                admin,
                ChangeType::Edit,
                "v2".into(),
                7,
                "r".into(),
                long_ago,
            )
            .await
            .unwrap();

        // The first tick fires immediately
        let handle = ProposalSweeper::new(policies.clone(), Duration::ZERO).spawn();
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.stop().await;

        // Read at a time the proposal is not yet due, so only the sweep could have resolved it
        let stored = policies._get_proposal(proposal.id, long_ago).await.unwrap();
        assert_eq!(stored.status, ProposalStatus::AutoApproved);
    }
}
