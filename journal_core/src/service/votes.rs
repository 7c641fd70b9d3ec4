use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, SqlErr, TransactionTrait};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zel_core::prelude::*;

use crate::{
    entity::prelude::*,
    error::ErrorKind,
    ids::{ProposalId, UserId, VoteId},
    models::tally::Tally,
    service::{
        authz::{self, AuthzError},
        policies,
    },
};

#[derive(Debug, Error)]
pub enum VotesServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error("proposal not found")]
    ProposalNotFound,

    #[error("user has already voted on this proposal")]
    AlreadyVoted,

    #[error("proposal is no longer accepting votes")]
    ProposalClosed,
}

impl VotesServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VotesServiceError::DbError(_) => ErrorKind::Infra,
            VotesServiceError::Authz(error) => error.kind(),
            VotesServiceError::ProposalNotFound => ErrorKind::NotFound,
            VotesServiceError::AlreadyVoted => ErrorKind::Conflict,
            VotesServiceError::ProposalClosed => ErrorKind::InvalidState,
        }
    }
}

impl From<VotesServiceError> for ResourceError {
    fn from(error: VotesServiceError) -> Self {
        match error.kind() {
            ErrorKind::Infra => ResourceError::infra(error),
            _ => ResourceError::app(error),
        }
    }
}

/// A recorded vote together with the proposal as it stands afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastVote {
    pub vote: PolicyVoteModel,
    pub proposal: PolicyProposalModel,
}

#[derive(Clone)]
pub struct VotesService {
    db: DatabaseConnection,
}

impl VotesService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Record a member's vote and resolve the proposal in the same transaction
    pub async fn _cast_vote(
        &self,
        proposal_id: ProposalId,
        user_id: UserId,
        vote: VoteChoice,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<CastVote, VotesServiceError> {
        let txn = self.db.begin().await?;

        let proposal = PolicyProposal::find_by_id(proposal_id)
            .one(&txn)
            .await?
            .ok_or(VotesServiceError::ProposalNotFound)?;

        authz::require_voice(&txn, proposal.group_id, user_id, now).await?;

        // A deadline that passed unnoticed closes the proposal before this vote
        let proposal = policies::resolve_in(&txn, proposal, now).await?;
        if proposal.status.is_terminal() {
            txn.commit().await?;
            return Err(VotesServiceError::ProposalClosed);
        }

        let existing = PolicyVote::find()
            .filter(PolicyVoteColumn::ProposalId.eq(proposal_id))
            .filter(PolicyVoteColumn::UserId.eq(user_id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            return Err(VotesServiceError::AlreadyVoted);
        }

        let ballot = PolicyVoteActiveModel {
            id: Set(VoteId::new()),
            proposal_id: Set(proposal_id),
            user_id: Set(user_id),
            vote: Set(vote),
            comment: Set(comment),
            voted_at: Set(now),
        };

        let vote = match PolicyVote::insert(ballot).exec_with_returning(&txn).await {
            Ok(vote) => vote,
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                tracing::warn!(%proposal_id, %user_id, "duplicate vote lost the race");
                return Err(VotesServiceError::AlreadyVoted);
            }
            Err(err) => return Err(err.into()),
        };

        let proposal = policies::resolve_in(&txn, proposal, now).await?;

        txn.commit().await?;

        tracing::info!(%proposal_id, %user_id, vote = ?vote.vote, "vote cast");
        Ok(CastVote { vote, proposal })
    }

    /// Current approve/reject counts for a proposal
    pub async fn _tally(&self, proposal_id: ProposalId) -> Result<Tally, VotesServiceError> {
        let votes = self._list_votes(proposal_id).await?;
        Ok(votes.iter().map(|v| v.vote).collect())
    }

    /// List the votes cast on a proposal, in casting order
    pub async fn _list_votes(
        &self,
        proposal_id: ProposalId,
    ) -> Result<Vec<PolicyVoteModel>, VotesServiceError> {
        PolicyProposal::find_by_id(proposal_id)
            .one(&self.db)
            .await?
            .ok_or(VotesServiceError::ProposalNotFound)?;

        let votes = PolicyVote::find()
            .filter(PolicyVoteColumn::ProposalId.eq(proposal_id))
            .order_by_asc(PolicyVoteColumn::VotedAt)
            .all(&self.db)
            .await?;

        Ok(votes)
    }
}

#[zel_service(name = "votes")]
trait Votes {
    #[doc = "Cast a vote on a pending proposal"]
    #[method(name = "cast_vote")]
    async fn cast_vote(
        &self,
        proposal_id: ProposalId,
        user_id: UserId,
        vote: VoteChoice,
        comment: Option<String>,
    ) -> Result<CastVote, ResourceError>;

    #[doc = "Current approve/reject counts for a proposal"]
    #[method(name = "tally")]
    async fn tally(&self, proposal_id: ProposalId) -> Result<Tally, ResourceError>;

    #[doc = "List the votes cast on a proposal"]
    #[method(name = "list_votes")]
    async fn list_votes(&self, proposal_id: ProposalId)
        -> Result<Vec<PolicyVoteModel>, ResourceError>;
}

#[async_trait]
impl VotesServer for VotesService {
    async fn cast_vote(
        &self,
        _ctx: RequestContext,
        proposal_id: ProposalId,
        user_id: UserId,
        vote: VoteChoice,
        comment: Option<String>,
    ) -> Result<CastVote, ResourceError> {
        Ok(self
            ._cast_vote(proposal_id, user_id, vote, comment, Utc::now())
            .await?)
    }

    async fn tally(
        &self,
        _ctx: RequestContext,
        proposal_id: ProposalId,
    ) -> Result<Tally, ResourceError> {
        Ok(self._tally(proposal_id).await?)
    }

    async fn list_votes(
        &self,
        _ctx: RequestContext,
        proposal_id: ProposalId,
    ) -> Result<Vec<PolicyVoteModel>, ResourceError> {
        Ok(self._list_votes(proposal_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyLimits;
    use crate::ids::{GroupId, PolicyId};
    use crate::models::migrator::Migrator;
    use crate::service::policies::PoliciesService;
    use chrono::Duration;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    struct Fixture {
        votes: VotesService,
        policies: PoliciesService,
        policy_id: PolicyId,
        members: Vec<UserId>,
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

        Group::insert(GroupActiveModel {
            id: Set(group_id),
            owner_id: Set(admin),
            name: Set("Voters".to_string()),
            created_at: Set(Utc::now()),
        })
        .exec(&db)
        .await
        .unwrap();

        let members: Vec<UserId> = (0..3).map(|_| UserId::new()).collect();
        let roles = std::iter::once((admin, MemberRole::Admin))
            .chain(members.iter().map(|m| (*m, MemberRole::Member)));
        for (user_id, role) in roles {
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

        let policies = PoliciesService::new(db.clone(), PolicyLimits::default());
        let policy = policies
            ._create_policy(group_id, admin, "Rule".into(), "v1".into(), 7, Utc::now())
            .await
            .unwrap();

        Fixture {
            votes: VotesService::new(db),
            policies,
            policy_id: policy.id,
            members,
        }
    }

    async fn propose(fx: &Fixture, now: DateTime<Utc>) -> PolicyProposalModel {
        fx.policies
            ._propose_change(
                fx.policy_id,
                fx.members[0],
                ChangeType::Edit,
                "v2".into(),
                7,
                "update".into(),
                now,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_decisive_vote_resolves_immediately() {
        let fx = setup_test_service().await;
        let t0 = Utc::now();
        let proposal = propose(&fx, t0).await;

        let cast = fx
            .votes
            ._cast_vote(
                proposal.id,
                fx.members[1],
                VoteChoice::Approve,
                None,
                t0 + Duration::days(2),
            )
            .await
            .unwrap();

        assert_eq!(cast.proposal.status, ProposalStatus::Approved);

        let policy = fx.policies._get_policy(fx.policy_id).await.unwrap();
        assert_eq!(policy.content, "v2");
        assert_eq!(policy.version, 2);

        // Terminal proposals accept no further votes
        let err = fx
            .votes
            ._cast_vote(
                proposal.id,
                fx.members[2],
                VoteChoice::Reject,
                None,
                t0 + Duration::days(2),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let tally = fx.votes._tally(proposal.id).await.unwrap();
        assert_eq!(tally, Tally { approve: 1, reject: 0 });
    }

    #[tokio::test]
    async fn test_reject_majority() {
        let fx = setup_test_service().await;
        let t0 = Utc::now();
        let proposal = propose(&fx, t0).await;

        let cast = fx
            .votes
            ._cast_vote(
                proposal.id,
                fx.members[1],
                VoteChoice::Reject,
                Some("too vague".into()),
                t0,
            )
            .await
            .unwrap();

        assert_eq!(cast.proposal.status, ProposalStatus::Rejected);
        assert_eq!(cast.vote.comment.as_deref(), Some("too vague"));

        let policy = fx.policies._get_policy(fx.policy_id).await.unwrap();
        assert_eq!(policy.version, 1);
        assert_eq!(policy.status, PolicyStatus::Active);
    }

    #[tokio::test]
    async fn test_second_vote_conflicts_and_leaves_tally_unchanged() {
        let fx = setup_test_service().await;
        let t0 = Utc::now();
        let proposal = propose(&fx, t0).await;

        // Seed a tie so the proposal stays pending between the two attempts
        for (user_id, choice) in [
            (fx.members[1], VoteChoice::Approve),
            (fx.members[2], VoteChoice::Reject),
        ] {
            PolicyVote::insert(PolicyVoteActiveModel {
                id: Set(VoteId::new()),
                proposal_id: Set(proposal.id),
                user_id: Set(user_id),
                vote: Set(choice),
                comment: Set(None),
                voted_at: Set(t0),
            })
            .exec(&fx.votes.db)
            .await
            .unwrap();
        }

        let err = fx
            .votes
            ._cast_vote(proposal.id, fx.members[1], VoteChoice::Reject, None, t0)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let tally = fx.votes._tally(proposal.id).await.unwrap();
        assert_eq!(tally, Tally { approve: 1, reject: 1 });

        let proposal = fx.policies._get_proposal(proposal.id, t0).await.unwrap();
        assert_eq!(proposal.status, ProposalStatus::Pending);
    }

    #[tokio::test]
    async fn test_vote_after_deadline_is_refused() {
        let fx = setup_test_service().await;
        let t0 = Utc::now();
        let proposal = propose(&fx, t0).await;

        let err = fx
            .votes
            ._cast_vote(
                proposal.id,
                fx.members[1],
                VoteChoice::Reject,
                None,
                t0 + Duration::days(8),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, VotesServiceError::ProposalClosed));

        // The lazy resolution that refused the vote was persisted
        let proposal = fx.policies._get_proposal(proposal.id, t0).await.unwrap();
        assert_eq!(proposal.status, ProposalStatus::AutoApproved);
        assert!(fx.votes._list_votes(proposal.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_member_cannot_vote() {
        let fx = setup_test_service().await;
        let t0 = Utc::now();
        let proposal = propose(&fx, t0).await;

        let err = fx
            .votes
            ._cast_vote(proposal.id, UserId::new(), VoteChoice::Approve, None, t0)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = fx
            .votes
            ._cast_vote(ProposalId::new(), fx.members[1], VoteChoice::Approve, None, t0)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
