//! Policies and the proposals that amend them.
//!
//! Deadline-driven resolution is lazy: `resolve_in` runs after every vote,
//! on every proposal read and from the optional sweeper, and is a cheap
//! no-op whenever the proposal is terminal or still undecided.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use thiserror::Error;
use zel_core::prelude::*;

use crate::{
    config::PolicyLimits,
    entity::prelude::*,
    error::ErrorKind,
    ids::{GroupId, PolicyId, ProposalId, UserId},
    models::tally::Tally,
    service::authz::{self, AuthzError},
};

#[derive(Debug, Error)]
pub enum PoliciesServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error("policy not found")]
    PolicyNotFound,

    #[error("proposal not found")]
    ProposalNotFound,

    #[error("approval period must be at least {min} days")]
    ApprovalDaysTooShort { min: i32 },

    #[error("approval period must be at most {max} days")]
    ApprovalDaysTooLong { max: i32 },

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("policy is archived")]
    PolicyArchived,
}

impl PoliciesServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PoliciesServiceError::DbError(_) => ErrorKind::Infra,
            PoliciesServiceError::Authz(error) => error.kind(),
            PoliciesServiceError::PolicyNotFound | PoliciesServiceError::ProposalNotFound => {
                ErrorKind::NotFound
            }
            PoliciesServiceError::ApprovalDaysTooShort { .. }
            | PoliciesServiceError::ApprovalDaysTooLong { .. }
            | PoliciesServiceError::EmptyField(_) => ErrorKind::Validation,
            PoliciesServiceError::PolicyArchived => ErrorKind::InvalidState,
        }
    }
}

impl From<PoliciesServiceError> for ResourceError {
    fn from(error: PoliciesServiceError) -> Self {
        match error.kind() {
            ErrorKind::Infra => ResourceError::infra(error),
            _ => ResourceError::app(error),
        }
    }
}

/// Resolve `proposal` at `now` if its tally or deadline allows it.
///
/// The pending -> terminal flip is a conditional update on `status`, so of
/// two callers racing on the same proposal only one applies the change to
/// the parent policy. Run this inside the transaction that should make the
/// outcome visible.
pub(crate) async fn resolve_in<C: ConnectionTrait>(
    conn: &C,
    proposal: PolicyProposalModel,
    now: DateTime<Utc>,
) -> Result<PolicyProposalModel, DbErr> {
    if proposal.status.is_terminal() {
        return Ok(proposal);
    }

    let votes = PolicyVote::find()
        .filter(PolicyVoteColumn::ProposalId.eq(proposal.id))
        .all(conn)
        .await?;
    let tally: Tally = votes.iter().map(|v| v.vote).collect();

    let Some(outcome) = tally.outcome(now, proposal.auto_approval_date) else {
        return Ok(proposal);
    };

    let result = PolicyProposal::update_many()
        .set(PolicyProposalActiveModel {
            status: Set(outcome),
            resolved_at: Set(Some(now)),
            ..Default::default()
        })
        .filter(PolicyProposalColumn::Id.eq(proposal.id))
        .filter(PolicyProposalColumn::Status.eq(ProposalStatus::Pending))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        tracing::warn!(proposal_id = %proposal.id, "proposal resolved concurrently");
        return PolicyProposal::find_by_id(proposal.id)
            .one(conn)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("proposal {}", proposal.id)));
    }

    let Some(policy) = Policy::find_by_id(proposal.policy_id).one(conn).await? else {
        return Err(DbErr::RecordNotFound(format!("policy {}", proposal.policy_id)));
    };

    let still_pending = PolicyProposal::find()
        .filter(PolicyProposalColumn::PolicyId.eq(policy.id))
        .filter(PolicyProposalColumn::Status.eq(ProposalStatus::Pending))
        .count(conn)
        .await?;

    let mut archived = policy.status == PolicyStatus::Archived;
    let mut policy_active: PolicyActiveModel = policy.clone().into();

    if outcome.is_accepted() {
        match proposal.change_type {
            ChangeType::Edit | ChangeType::NewRule => {
                policy_active.content = Set(proposal.proposed_content.clone());
            }
            ChangeType::Delete => archived = true,
        }
        policy_active.version = Set(policy.version + 1);
        policy_active.approval_days = Set(proposal.approval_days);
        policy_active.proposer_id = Set(Some(proposal.proposer_id));
        policy_active.approved_at = Set(Some(now));
    }

    policy_active.status = Set(if archived {
        PolicyStatus::Archived
    } else if still_pending > 0 {
        PolicyStatus::Proposed
    } else {
        PolicyStatus::Active
    });
    policy_active.update(conn).await?;

    tracing::info!(
        proposal_id = %proposal.id,
        policy_id = %proposal.policy_id,
        approve = tally.approve,
        reject = tally.reject,
        status = ?outcome,
        "proposal resolved"
    );

    Ok(PolicyProposalModel {
        status: outcome,
        resolved_at: Some(now),
        ..proposal
    })
}

#[derive(Clone)]
pub struct PoliciesService {
    db: DatabaseConnection,
    limits: PolicyLimits,
}

impl PoliciesService {
    pub fn new(db: DatabaseConnection, limits: PolicyLimits) -> Self {
        Self {
            db,
            limits: limits.normalized(),
        }
    }

    /// Create a founding policy for a group (admins only)
    pub async fn _create_policy(
        &self,
        group_id: GroupId,
        creator_id: UserId,
        title: String,
        content: String,
        approval_days: i32,
        now: DateTime<Utc>,
    ) -> Result<PolicyModel, PoliciesServiceError> {
        authz::require_primary_admin(&self.db, group_id, creator_id).await?;

        if title.trim().is_empty() {
            return Err(PoliciesServiceError::EmptyField("title"));
        }
        self.check_window(approval_days, self.limits.min_approval_days)?;

        let policy = PolicyActiveModel {
            id: Set(PolicyId::new()),
            group_id: Set(group_id),
            title: Set(title),
            content: Set(content),
            version: Set(1),
            status: Set(PolicyStatus::Active),
            created_by: Set(creator_id),
            proposer_id: Set(None),
            approval_days: Set(approval_days),
            proposed_at: Set(None),
            approved_at: Set(Some(now)),
        };

        let result = Policy::insert(policy).exec_with_returning(&self.db).await?;

        tracing::info!(policy_id = %result.id, %group_id, "policy created");
        Ok(result)
    }

    /// Get a specific policy by ID
    pub async fn _get_policy(
        &self,
        policy_id: PolicyId,
    ) -> Result<PolicyModel, PoliciesServiceError> {
        Policy::find_by_id(policy_id)
            .one(&self.db)
            .await?
            .ok_or(PoliciesServiceError::PolicyNotFound)
    }

    /// List the non-archived policies of a group
    pub async fn _list_policies(
        &self,
        group_id: GroupId,
    ) -> Result<Vec<PolicyModel>, PoliciesServiceError> {
        let policies = Policy::find()
            .filter(PolicyColumn::GroupId.eq(group_id))
            .filter(PolicyColumn::Status.ne(PolicyStatus::Archived))
            .order_by_asc(PolicyColumn::Title)
            .all(&self.db)
            .await?;

        Ok(policies)
    }

    /// Propose a change to a policy; any member with a voice may do so
    #[allow(clippy::too_many_arguments)]
    pub async fn _propose_change(
        &self,
        policy_id: PolicyId,
        proposer_id: UserId,
        change_type: ChangeType,
        proposed_content: String,
        approval_days: i32,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<PolicyProposalModel, PoliciesServiceError> {
        let txn = self.db.begin().await?;

        let policy = Policy::find_by_id(policy_id)
            .one(&txn)
            .await?
            .ok_or(PoliciesServiceError::PolicyNotFound)?;

        authz::require_voice(&txn, policy.group_id, proposer_id, now).await?;

        if policy.status == PolicyStatus::Archived {
            return Err(PoliciesServiceError::PolicyArchived);
        }
        if change_type != ChangeType::Delete && proposed_content.trim().is_empty() {
            return Err(PoliciesServiceError::EmptyField("proposed content"));
        }
        self.check_window(approval_days, policy.approval_days)?;

        let proposal = PolicyProposalActiveModel {
            id: Set(ProposalId::new()),
            policy_id: Set(policy_id),
            group_id: Set(policy.group_id),
            proposer_id: Set(proposer_id),
            change_type: Set(change_type),
            proposed_content: Set(proposed_content),
            reason: Set(reason),
            approval_days: Set(approval_days),
            status: Set(ProposalStatus::Pending),
            created_at: Set(now),
            auto_approval_date: Set(now + Duration::days(i64::from(approval_days))),
            resolved_at: Set(None),
        };

        let result = PolicyProposal::insert(proposal)
            .exec_with_returning(&txn)
            .await?;

        let mut policy_active: PolicyActiveModel = policy.into();
        policy_active.status = Set(PolicyStatus::Proposed);
        policy_active.proposed_at = Set(Some(now));
        policy_active.update(&txn).await?;

        txn.commit().await?;

        tracing::info!(
            proposal_id = %result.id,
            %policy_id,
            deadline = %result.auto_approval_date,
            "proposal opened"
        );
        Ok(result)
    }

    /// Resolve a proposal if it is due; no-op when terminal or undecided
    pub async fn _resolve_proposal(
        &self,
        proposal_id: ProposalId,
        now: DateTime<Utc>,
    ) -> Result<PolicyProposalModel, PoliciesServiceError> {
        let txn = self.db.begin().await?;

        let proposal = PolicyProposal::find_by_id(proposal_id)
            .one(&txn)
            .await?
            .ok_or(PoliciesServiceError::ProposalNotFound)?;

        let proposal = resolve_in(&txn, proposal, now).await?;

        txn.commit().await?;
        Ok(proposal)
    }

    /// Get a proposal, resolving it first if its deadline has passed
    pub async fn _get_proposal(
        &self,
        proposal_id: ProposalId,
        now: DateTime<Utc>,
    ) -> Result<PolicyProposalModel, PoliciesServiceError> {
        self._resolve_proposal(proposal_id, now).await
    }

    /// List all proposals against a policy, oldest first
    pub async fn _list_proposals(
        &self,
        policy_id: PolicyId,
        now: DateTime<Utc>,
    ) -> Result<Vec<PolicyProposalModel>, PoliciesServiceError> {
        self._get_policy(policy_id).await?;

        let txn = self.db.begin().await?;

        let proposals = PolicyProposal::find()
            .filter(PolicyProposalColumn::PolicyId.eq(policy_id))
            .order_by_asc(PolicyProposalColumn::CreatedAt)
            .all(&txn)
            .await?;

        let mut resolved = Vec::with_capacity(proposals.len());
        for proposal in proposals {
            resolved.push(resolve_in(&txn, proposal, now).await?);
        }

        txn.commit().await?;
        Ok(resolved)
    }

    /// Resolve every pending proposal whose deadline has passed, returning
    /// the ones that changed
    pub async fn _resolve_due_proposals(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<PolicyProposalModel>, PoliciesServiceError> {
        let due = PolicyProposal::find()
            .filter(PolicyProposalColumn::Status.eq(ProposalStatus::Pending))
            .filter(PolicyProposalColumn::AutoApprovalDate.lte(now))
            .order_by_asc(PolicyProposalColumn::AutoApprovalDate)
            .all(&self.db)
            .await?;

        let mut resolved = Vec::new();
        for proposal in due {
            let txn = self.db.begin().await?;
            let proposal = resolve_in(&txn, proposal, now).await?;
            txn.commit().await?;

            if proposal.status.is_terminal() {
                resolved.push(proposal);
            }
        }

        Ok(resolved)
    }

    fn check_window(&self, approval_days: i32, floor: i32) -> Result<(), PoliciesServiceError> {
        let min = floor.max(self.limits.min_approval_days);
        if approval_days < min {
            return Err(PoliciesServiceError::ApprovalDaysTooShort { min });
        }
        if approval_days > self.limits.max_approval_days {
            return Err(PoliciesServiceError::ApprovalDaysTooLong {
                max: self.limits.max_approval_days,
            });
        }
        Ok(())
    }
}

#[zel_service(name = "policies")]
trait Policies {
    #[doc = "Create a founding policy for a group"]
    #[method(name = "create_policy")]
    async fn create_policy(
        &self,
        group_id: GroupId,
        creator_id: UserId,
        title: String,
        content: String,
        approval_days: i32,
    ) -> Result<PolicyModel, ResourceError>;

    #[doc = "Get a specific policy by ID"]
    #[method(name = "get_policy")]
    async fn get_policy(&self, policy_id: PolicyId) -> Result<PolicyModel, ResourceError>;

    #[doc = "List the non-archived policies of a group"]
    #[method(name = "list_policies")]
    async fn list_policies(&self, group_id: GroupId) -> Result<Vec<PolicyModel>, ResourceError>;

    #[doc = "Propose a change to a policy"]
    #[method(name = "propose_change")]
    async fn propose_change(
        &self,
        policy_id: PolicyId,
        proposer_id: UserId,
        change_type: ChangeType,
        proposed_content: String,
        approval_days: i32,
        reason: String,
    ) -> Result<PolicyProposalModel, ResourceError>;

    #[doc = "Resolve a proposal if it is due"]
    #[method(name = "resolve_proposal")]
    async fn resolve_proposal(
        &self,
        proposal_id: ProposalId,
    ) -> Result<PolicyProposalModel, ResourceError>;

    #[doc = "Get a proposal"]
    #[method(name = "get_proposal")]
    async fn get_proposal(&self, proposal_id: ProposalId)
        -> Result<PolicyProposalModel, ResourceError>;

    #[doc = "List all proposals against a policy"]
    #[method(name = "list_proposals")]
    async fn list_proposals(
        &self,
        policy_id: PolicyId,
    ) -> Result<Vec<PolicyProposalModel>, ResourceError>;
}

#[async_trait]
impl PoliciesServer for PoliciesService {
    async fn create_policy(
        &self,
        _ctx: RequestContext,
        group_id: GroupId,
        creator_id: UserId,
        title: String,
        content: String,
        approval_days: i32,
    ) -> Result<PolicyModel, ResourceError> {
        Ok(self
            ._create_policy(group_id, creator_id, title, content, approval_days, Utc::now())
            .await?)
    }

    async fn get_policy(
        &self,
        _ctx: RequestContext,
        policy_id: PolicyId,
    ) -> Result<PolicyModel, ResourceError> {
        Ok(self._get_policy(policy_id).await?)
    }

    async fn list_policies(
        &self,
        _ctx: RequestContext,
        group_id: GroupId,
    ) -> Result<Vec<PolicyModel>, ResourceError> {
        Ok(self._list_policies(group_id).await?)
    }

    async fn propose_change(
        &self,
        _ctx: RequestContext,
        policy_id: PolicyId,
        proposer_id: UserId,
        change_type: ChangeType,
        proposed_content: String,
        approval_days: i32,
        reason: String,
    ) -> Result<PolicyProposalModel, ResourceError> {
        Ok(self
            ._propose_change(
                policy_id,
                proposer_id,
                change_type,
                proposed_content,
                approval_days,
                reason,
                Utc::now(),
            )
            .await?)
    }

    async fn resolve_proposal(
        &self,
        _ctx: RequestContext,
        proposal_id: ProposalId,
    ) -> Result<PolicyProposalModel, ResourceError> {
        Ok(self._resolve_proposal(proposal_id, Utc::now()).await?)
    }

    async fn get_proposal(
        &self,
        _ctx: RequestContext,
        proposal_id: ProposalId,
    ) -> Result<PolicyProposalModel, ResourceError> {
        Ok(self._get_proposal(proposal_id, Utc::now()).await?)
    }

    async fn list_proposals(
        &self,
        _ctx: RequestContext,
        policy_id: PolicyId,
    ) -> Result<Vec<PolicyProposalModel>, ResourceError> {
        Ok(self._list_proposals(policy_id, Utc::now()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{PenaltyId, VoteId};
    use crate::models::migrator::Migrator;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    struct Fixture {
        service: PoliciesService,
        group_id: GroupId,
        admin: UserId,
        member: UserId,
    }

    async fn setup_test_service() -> Fixture {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let group_id = GroupId::new();
        let admin = UserId::new();
        let member = UserId::new();

        Group::insert(GroupActiveModel {
            id: Set(group_id),
            owner_id: Set(admin),
            name: Set("Writers".to_string()),
            created_at: Set(Utc::now()),
        })
        .exec(&db)
        .await
        .unwrap();

        for (user_id, role) in [(admin, MemberRole::Admin), (member, MemberRole::Member)] {
            GroupMember::insert(GroupMemberActiveModel {
                group_id: Set(group_id),
                user_id: Set(user_id),
                role: Set(role),
                joined_at: Set(Utc::now()),
            })
            .exec(&db)
            .await
            .unwrap();
        }

        Fixture {
            service: PoliciesService::new(db, PolicyLimits::default()),
            group_id,
            admin,
            member,
        }
    }

    async fn create_policy(fx: &Fixture, now: DateTime<Utc>) -> PolicyModel {
        fx.service
            ._create_policy(
                fx.group_id,
                fx.admin,
                "Be kind".to_string(),
                "Respectful communication only".to_string(),
                7,
                now,
            )
            .await
            .expect("Failed to create policy")
    }

    async fn cast(db: &DatabaseConnection, proposal_id: ProposalId, vote: VoteChoice) {
        PolicyVote::insert(PolicyVoteActiveModel {
            id: Set(VoteId::new()),
            proposal_id: Set(proposal_id),
            user_id: Set(UserId::new()),
            vote: Set(vote),
            comment: Set(None),
            voted_at: Set(Utc::now()),
        })
        .exec(db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_create_policy() {
        let fx = setup_test_service().await;
        let now = Utc::now();
        let policy = create_policy(&fx, now).await;

        assert_eq!(policy.version, 1);
        assert_eq!(policy.status, PolicyStatus::Active);
        assert_eq!(policy.approval_days, 7);
        assert_eq!(policy.proposer_id, None);
        assert_eq!(policy.approved_at, Some(now));

        let listed = fx.service._list_policies(fx.group_id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn test_create_policy_requires_admin_and_window() {
        let fx = setup_test_service().await;

        let err = fx
            .service
            ._create_policy(fx.group_id, fx.member, "T".into(), "C".into(), 7, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        for days in [6, 31] {
            let err = fx
                .service
                ._create_policy(fx.group_id, fx.admin, "T".into(), "C".into(), days, Utc::now())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{days} days should be rejected");
        }
    }

    #[tokio::test]
    async fn test_configured_floor_cannot_drop_below_a_week() {
        let fx = setup_test_service().await;
        let loose = PoliciesService::new(
            fx.service.db.clone(),
            PolicyLimits {
                min_approval_days: 3,
                max_approval_days: 2,
            },
        );

        let err = loose
            ._create_policy(fx.group_id, fx.admin, "T".into(), "C".into(), 5, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, PoliciesServiceError::ApprovalDaysTooShort { min: 7 }));

        let policy = loose
            ._create_policy(fx.group_id, fx.admin, "T".into(), "C".into(), 7, Utc::now())
            .await
            .expect("a week is always allowed");
        assert_eq!(policy.approval_days, 7);
    }

    #[tokio::test]
    async fn test_founding_policy_reads_back_without_proposer() {
        let fx = setup_test_service().await;
        let created = create_policy(&fx, Utc::now()).await;

        let fetched = fx.service._get_policy(created.id).await.unwrap();
        assert_eq!(fetched.proposer_id, None);
        assert_eq!(fetched.title, created.title);

        let listed = fx.service._list_policies(fx.group_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].proposer_id, None);
    }

    #[tokio::test]
    async fn test_proposal_cannot_shorten_window() {
        let fx = setup_test_service().await;
        let policy = create_policy(&fx, Utc::now()).await;

        let err = fx
            .service
            ._propose_change(
                policy.id,
                fx.member,
                ChangeType::Edit,
                "New text".into(),
                5,
                "shorter".into(),
                Utc::now(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PoliciesServiceError::ApprovalDaysTooShort { min: 7 }));
        assert_eq!(err.to_string(), "approval period must be at least 7 days");
    }

    #[tokio::test]
    async fn test_non_member_cannot_propose() {
        let fx = setup_test_service().await;
        let policy = create_policy(&fx, Utc::now()).await;

        let err = fx
            .service
            ._propose_change(
                policy.id,
                UserId::new(),
                ChangeType::Edit,
                "New text".into(),
                7,
                "outsider".into(),
                Utc::now(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_muted_member_cannot_propose() {
        let fx = setup_test_service().await;
        let now = Utc::now();
        let policy = create_policy(&fx, now).await;

        MemberPenalty::insert(MemberPenaltyActiveModel {
            id: Set(PenaltyId::new()),
            group_id: Set(fx.group_id),
            user_id: Set(fx.member),
            penalty_type: Set(PenaltyType::Mute),
            duration_days: Set(Some(7)),
            reason: Set("spam".into()),
            issued_by: Set(fx.admin),
            debate_id: Set(None),
            issued_at: Set(now),
            expires_at: Set(Some(now + Duration::days(7))),
        })
        .exec(&fx.service.db)
        .await
        .unwrap();

        let err = fx
            .service
            ._propose_change(policy.id, fx.member, ChangeType::Edit, "x".into(), 7, "r".into(), now)
            .await
            .unwrap_err();
        assert!(matches!(err, PoliciesServiceError::Authz(AuthzError::Muted)));
    }

    #[tokio::test]
    async fn test_proposal_marks_policy_proposed() {
        let fx = setup_test_service().await;
        let t0 = Utc::now();
        let policy = create_policy(&fx, t0).await;

        let proposal = fx
            .service
            ._propose_change(
                policy.id,
                fx.member,
                ChangeType::Edit,
                "Kindness first".into(),
                10,
                "clarify".into(),
                t0,
            )
            .await
            .unwrap();

        assert_eq!(proposal.status, ProposalStatus::Pending);
        assert_eq!(proposal.auto_approval_date, t0 + Duration::days(10));

        let policy = fx.service._get_policy(policy.id).await.unwrap();
        assert_eq!(policy.status, PolicyStatus::Proposed);
        assert_eq!(policy.proposed_at, Some(t0));
    }

    #[tokio::test]
    async fn test_silence_auto_approves_after_deadline() {
        let fx = setup_test_service().await;
        let t0 = Utc::now();
        let policy = create_policy(&fx, t0).await;

        let proposal = fx
            .service
            ._propose_change(
                policy.id,
                fx.member,
                ChangeType::Edit,
                "Kindness first".into(),
                14,
                "clarify".into(),
                t0,
            )
            .await
            .unwrap();

        let early = fx
            .service
            ._resolve_proposal(proposal.id, t0 + Duration::days(13))
            .await
            .unwrap();
        assert_eq!(early.status, ProposalStatus::Pending);

        let resolved = fx
            .service
            ._get_proposal(proposal.id, t0 + Duration::days(14) + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(resolved.status, ProposalStatus::AutoApproved);

        let policy = fx.service._get_policy(policy.id).await.unwrap();
        assert_eq!(policy.content, "Kindness first");
        assert_eq!(policy.approval_days, 14);
        assert_eq!(policy.version, 2);
        assert_eq!(policy.status, PolicyStatus::Active);
        assert_eq!(policy.proposer_id, Some(fx.member));
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let fx = setup_test_service().await;
        let t0 = Utc::now();
        let policy = create_policy(&fx, t0).await;

        let proposal = fx
            .service
            ._propose_change(policy.id, fx.member, ChangeType::Edit, "v2".into(), 7, "r".into(), t0)
            .await
            .unwrap();

        let after = t0 + Duration::days(8);
        let first = fx.service._resolve_proposal(proposal.id, after).await.unwrap();
        let second = fx.service._resolve_proposal(proposal.id, after).await.unwrap();

        assert_eq!(first.status, ProposalStatus::AutoApproved);
        assert_eq!(second.status, first.status);
        assert!(second.resolved_at.is_some());

        let policy = fx.service._get_policy(policy.id).await.unwrap();
        assert_eq!(policy.version, 2, "Policy should be bumped only once");
    }

    #[tokio::test]
    async fn test_rejection_leaves_policy_untouched() {
        let fx = setup_test_service().await;
        let t0 = Utc::now();
        let policy = create_policy(&fx, t0).await;

        let proposal = fx
            .service
            ._propose_change(policy.id, fx.member, ChangeType::Edit, "v2".into(), 7, "r".into(), t0)
            .await
            .unwrap();
        cast(&fx.service.db, proposal.id, VoteChoice::Reject).await;

        let resolved = fx
            .service
            ._resolve_proposal(proposal.id, t0 + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(resolved.status, ProposalStatus::Rejected);

        let after = fx.service._get_policy(policy.id).await.unwrap();
        assert_eq!(after.content, policy.content);
        assert_eq!(after.version, 1);
        assert_eq!(after.status, PolicyStatus::Active);
    }

    #[tokio::test]
    async fn test_policy_stays_proposed_while_other_proposals_pending() {
        let fx = setup_test_service().await;
        let t0 = Utc::now();
        let policy = create_policy(&fx, t0).await;

        let first = fx
            .service
            ._propose_change(policy.id, fx.member, ChangeType::Edit, "a".into(), 7, "r".into(), t0)
            .await
            .unwrap();
        fx.service
            ._propose_change(
                policy.id,
                fx.admin,
                ChangeType::NewRule,
                "b".into(),
                20,
                "r".into(),
                t0,
            )
            .await
            .unwrap();

        let resolved = fx.service._resolve_due_proposals(t0 + Duration::days(8)).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, first.id);

        let policy = fx.service._get_policy(policy.id).await.unwrap();
        assert_eq!(policy.status, PolicyStatus::Proposed);
        assert_eq!(policy.content, "a");

        let resolved = fx.service._resolve_due_proposals(t0 + Duration::days(21)).await.unwrap();
        assert_eq!(resolved.len(), 1);

        let policy = fx.service._get_policy(policy.id).await.unwrap();
        assert_eq!(policy.status, PolicyStatus::Active);
        assert_eq!(policy.content, "b");
        assert_eq!(policy.approval_days, 20);
        assert_eq!(policy.version, 3);
    }

    #[tokio::test]
    async fn test_accepted_delete_archives_policy() {
        let fx = setup_test_service().await;
        let t0 = Utc::now();
        let policy = create_policy(&fx, t0).await;

        let proposal = fx
            .service
            ._propose_change(
                policy.id,
                fx.member,
                ChangeType::Delete,
                String::new(),
                7,
                "obsolete".into(),
                t0,
            )
            .await
            .unwrap();
        cast(&fx.service.db, proposal.id, VoteChoice::Approve).await;

        let resolved = fx.service._resolve_proposal(proposal.id, t0).await.unwrap();
        assert_eq!(resolved.status, ProposalStatus::Approved);

        let policy = fx.service._get_policy(policy.id).await.unwrap();
        assert_eq!(policy.status, PolicyStatus::Archived);
        assert!(fx.service._list_policies(fx.group_id).await.unwrap().is_empty());

        let err = fx
            .service
            ._propose_change(
                policy.id,
                fx.member,
                ChangeType::Edit,
                "back".into(),
                7,
                "r".into(),
                t0,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn test_list_proposals_resolves_lazily() {
        let fx = setup_test_service().await;
        let t0 = Utc::now();
        let policy = create_policy(&fx, t0).await;

        fx.service
            ._propose_change(policy.id, fx.member, ChangeType::Edit, "v2".into(), 7, "r".into(), t0)
            .await
            .unwrap();

        let proposals = fx
            .service
            ._list_proposals(policy.id, t0 + Duration::days(7))
            .await
            .unwrap();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].status, ProposalStatus::AutoApproved);
    }

    #[tokio::test]
    async fn test_missing_policy() {
        let fx = setup_test_service().await;

        let err = fx.service._get_policy(PolicyId::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = fx
            .service
            ._resolve_proposal(ProposalId::new(), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
