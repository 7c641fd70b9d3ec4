//! Flagged comments and the debates they open.
//!
//! A flag and its debate are always written in one transaction, and closing
//! a debate is a conditional `active -> closed` update, so a debate yields
//! at most one penalty however many admins press the button.

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zel_core::prelude::*;

use crate::{
    entity::prelude::*,
    error::ErrorKind,
    ids::{DebateId, FlagId, GroupId, InteractionId, MessageId, PolicyId, UserId},
    models::penalty::PenaltyDecision,
    service::{
        authz::{self, AuthzError},
        penalties::{self, PenaltiesServiceError, PenaltyRequest},
    },
};

#[derive(Debug, Error)]
pub enum DebatesServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Penalty(#[from] PenaltiesServiceError),

    #[error("comment not found")]
    CommentNotFound,

    #[error("policy not found in this group")]
    PolicyNotFound,

    #[error("debate not found")]
    DebateNotFound,

    #[error("forbidden: not a participant in this debate")]
    NotParticipant,

    #[error("comment already has an open debate")]
    AlreadyFlagged,

    #[error("debate is closed")]
    DebateClosed,

    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

impl DebatesServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DebatesServiceError::DbError(_) => ErrorKind::Infra,
            DebatesServiceError::Authz(error) => error.kind(),
            DebatesServiceError::Penalty(error) => error.kind(),
            DebatesServiceError::CommentNotFound
            | DebatesServiceError::PolicyNotFound
            | DebatesServiceError::DebateNotFound => ErrorKind::NotFound,
            DebatesServiceError::NotParticipant => ErrorKind::Forbidden,
            DebatesServiceError::AlreadyFlagged => ErrorKind::Conflict,
            DebatesServiceError::DebateClosed => ErrorKind::InvalidState,
            DebatesServiceError::EmptyField(_) => ErrorKind::Validation,
        }
    }
}

impl From<DebatesServiceError> for ResourceError {
    fn from(error: DebatesServiceError) -> Self {
        match error.kind() {
            ErrorKind::Infra => ResourceError::infra(error),
            _ => ResourceError::app(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagOpened {
    pub flag: FlaggedCommentModel,
    pub debate: CommentDebateModel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedDebate {
    pub debate: CommentDebateModel,
    pub flag: FlaggedCommentModel,
    pub penalty: Option<MemberPenaltyModel>,
}

/// Flagger, comment author, anyone who has already posted, and moderators.
async fn is_participant<C: ConnectionTrait>(
    conn: &C,
    debate: &CommentDebateModel,
    flag: &FlaggedCommentModel,
    user_id: UserId,
) -> Result<bool, DbErr> {
    if flag.flagger_id == user_id || flag.comment_author_id == user_id {
        return Ok(true);
    }

    if let Some(role) = authz::role_of(conn, debate.group_id, user_id).await? {
        if role.is_moderator() {
            return Ok(true);
        }
    }

    let posted = DebateMessage::find()
        .filter(DebateMessageColumn::DebateId.eq(debate.id))
        .filter(DebateMessageColumn::AuthorId.eq(user_id))
        .count(conn)
        .await?;

    Ok(posted > 0)
}

/// Load a debate and its flag, failing unless `user_id` may take part.
async fn load_for<C: ConnectionTrait>(
    conn: &C,
    debate_id: DebateId,
    user_id: UserId,
) -> Result<(CommentDebateModel, FlaggedCommentModel), DebatesServiceError> {
    let (debate, flag) = CommentDebate::find_by_id(debate_id)
        .find_also_related(FlaggedComment)
        .one(conn)
        .await?
        .ok_or(DebatesServiceError::DebateNotFound)?;
    let flag = flag.ok_or(DebatesServiceError::DebateNotFound)?;

    if !is_participant(conn, &debate, &flag, user_id).await? {
        tracing::debug!(%debate_id, %user_id, "debate access denied");
        return Err(DebatesServiceError::NotParticipant);
    }

    Ok((debate, flag))
}

#[derive(Clone)]
pub struct DebatesService {
    db: DatabaseConnection,
}

impl DebatesService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Flag a comment as violating a policy, opening its debate
    pub async fn _flag_comment(
        &self,
        interaction_id: InteractionId,
        flagger_id: UserId,
        policy_id: PolicyId,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<FlagOpened, DebatesServiceError> {
        if reason.trim().is_empty() {
            return Err(DebatesServiceError::EmptyField("reason"));
        }

        let txn = self.db.begin().await?;

        let comment = EntryInteraction::find_by_id(interaction_id)
            .one(&txn)
            .await?
            .filter(|i| i.kind == InteractionKind::Comment)
            .ok_or(DebatesServiceError::CommentNotFound)?;

        // Only comments on group entries can be moderated
        let group_id = JournalEntry::find_by_id(comment.entry_id)
            .one(&txn)
            .await?
            .and_then(|entry| entry.group_id)
            .ok_or(DebatesServiceError::CommentNotFound)?;

        authz::require_voice(&txn, group_id, flagger_id, now).await?;

        Policy::find_by_id(policy_id)
            .one(&txn)
            .await?
            .filter(|p| p.group_id == group_id)
            .ok_or(DebatesServiceError::PolicyNotFound)?;

        let open = FlaggedComment::find()
            .filter(FlaggedCommentColumn::InteractionId.eq(interaction_id))
            .filter(
                FlaggedCommentColumn::Status.is_in([FlagStatus::Pending, FlagStatus::UnderDebate]),
            )
            .count(&txn)
            .await?;
        if open > 0 {
            return Err(DebatesServiceError::AlreadyFlagged);
        }

        let flag_id = FlagId::new();
        let flag = FlaggedCommentActiveModel {
            id: Set(flag_id),
            group_id: Set(group_id),
            interaction_id: Set(interaction_id),
            flagger_id: Set(flagger_id),
            comment_author_id: Set(comment.user_id),
            policy_id: Set(policy_id),
            reason: Set(reason),
            status: Set(FlagStatus::Pending),
            created_at: Set(now),
        };
        let flag = FlaggedComment::insert(flag).exec_with_returning(&txn).await?;

        let debate = CommentDebateActiveModel {
            id: Set(DebateId::new()),
            flag_id: Set(flag_id),
            group_id: Set(group_id),
            status: Set(DebateStatus::Active),
            admin_decision: Set(None),
            penalty: Set(None),
            decided_by: Set(None),
            decided_at: Set(None),
            created_at: Set(now),
        };
        let debate = CommentDebate::insert(debate).exec_with_returning(&txn).await?;

        let mut flag_active: FlaggedCommentActiveModel = flag.into();
        flag_active.status = Set(FlagStatus::UnderDebate);
        let flag = flag_active.update(&txn).await?;

        txn.commit().await?;

        tracing::info!(
            %flag_id,
            debate_id = %debate.id,
            %group_id,
            %flagger_id,
            "comment flagged, debate opened"
        );
        Ok(FlagOpened { flag, debate })
    }

    /// Append a message to an active debate
    pub async fn _post_debate_message(
        &self,
        debate_id: DebateId,
        author_id: UserId,
        message: String,
        now: DateTime<Utc>,
    ) -> Result<DebateMessageModel, DebatesServiceError> {
        if message.trim().is_empty() {
            return Err(DebatesServiceError::EmptyField("message"));
        }

        let txn = self.db.begin().await?;

        let (debate, _) = load_for(&txn, debate_id, author_id).await?;

        if debate.status == DebateStatus::Closed {
            return Err(DebatesServiceError::DebateClosed);
        }

        authz::require_voice(&txn, debate.group_id, author_id, now).await?;

        let entry = DebateMessageActiveModel {
            id: Set(MessageId::new()),
            debate_id: Set(debate_id),
            author_id: Set(author_id),
            message: Set(message),
            created_at: Set(now),
        };

        let result = DebateMessage::insert(entry).exec_with_returning(&txn).await?;

        txn.commit().await?;
        Ok(result)
    }

    /// Close a debate with a decision, issuing the penalty if there is one
    pub async fn _close_debate(
        &self,
        debate_id: DebateId,
        admin_id: UserId,
        decision: String,
        penalty: Option<PenaltyDecision>,
        now: DateTime<Utc>,
    ) -> Result<ClosedDebate, DebatesServiceError> {
        if decision.trim().is_empty() {
            return Err(DebatesServiceError::EmptyField("decision"));
        }

        let txn = self.db.begin().await?;

        let debate = CommentDebate::find_by_id(debate_id)
            .one(&txn)
            .await?
            .ok_or(DebatesServiceError::DebateNotFound)?;

        authz::require_admin(&txn, debate.group_id, admin_id).await?;

        if debate.status == DebateStatus::Closed {
            return Err(DebatesServiceError::DebateClosed);
        }

        let penalty = penalty.unwrap_or(PenaltyDecision::Dismissed);

        let result = CommentDebate::update_many()
            .set(CommentDebateActiveModel {
                status: Set(DebateStatus::Closed),
                admin_decision: Set(Some(decision.clone())),
                penalty: Set(Some(penalty.to_string())),
                decided_by: Set(Some(admin_id)),
                decided_at: Set(Some(now)),
                ..Default::default()
            })
            .filter(CommentDebateColumn::Id.eq(debate_id))
            .filter(CommentDebateColumn::Status.eq(DebateStatus::Active))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            tracing::warn!(%debate_id, %admin_id, "debate closed concurrently");
            return Err(DebatesServiceError::DebateClosed);
        }

        let flag = FlaggedComment::find_by_id(debate.flag_id)
            .one(&txn)
            .await?
            .ok_or(DebatesServiceError::CommentNotFound)?;

        let issued = match penalty.penalty_type() {
            Some(penalty_type) => {
                let request = PenaltyRequest {
                    group_id: debate.group_id,
                    user_id: flag.comment_author_id,
                    penalty_type,
                    duration_days: penalty.duration_days(),
                    reason: decision,
                    issued_by: admin_id,
                    debate_id: Some(debate_id),
                };
                Some(penalties::issue_in(&txn, request, now).await?)
            }
            None => None,
        };

        let mut flag_active: FlaggedCommentActiveModel = flag.into();
        flag_active.status = Set(if issued.is_some() {
            FlagStatus::Resolved
        } else {
            FlagStatus::Dismissed
        });
        let flag = flag_active.update(&txn).await?;

        let debate = CommentDebate::find_by_id(debate_id)
            .one(&txn)
            .await?
            .ok_or(DebatesServiceError::DebateNotFound)?;

        txn.commit().await?;

        tracing::info!(%debate_id, %admin_id, %penalty, "debate closed");
        Ok(ClosedDebate {
            debate,
            flag,
            penalty: issued,
        })
    }

    /// Get a debate (participants and moderators only)
    pub async fn _get_debate(
        &self,
        debate_id: DebateId,
        viewer_id: UserId,
    ) -> Result<CommentDebateModel, DebatesServiceError> {
        let (debate, _) = load_for(&self.db, debate_id, viewer_id).await?;
        Ok(debate)
    }

    /// List a debate's messages in posting order (participants and moderators only)
    pub async fn _list_debate_messages(
        &self,
        debate_id: DebateId,
        viewer_id: UserId,
    ) -> Result<Vec<DebateMessageModel>, DebatesServiceError> {
        load_for(&self.db, debate_id, viewer_id).await?;

        let messages = DebateMessage::find()
            .filter(DebateMessageColumn::DebateId.eq(debate_id))
            .order_by_asc(DebateMessageColumn::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(messages)
    }

    /// List a group's flags, newest first (moderators only)
    pub async fn _list_flags(
        &self,
        group_id: GroupId,
        admin_id: UserId,
        status: Option<FlagStatus>,
    ) -> Result<Vec<FlaggedCommentModel>, DebatesServiceError> {
        authz::require_admin(&self.db, group_id, admin_id).await?;

        let mut query = FlaggedComment::find().filter(FlaggedCommentColumn::GroupId.eq(group_id));
        if let Some(status) = status {
            query = query.filter(FlaggedCommentColumn::Status.eq(status));
        }

        let flags = query
            .order_by_desc(FlaggedCommentColumn::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(flags)
    }
}

#[zel_service(name = "debates")]
trait Debates {
    #[doc = "Flag a comment as violating a policy"]
    #[method(name = "flag_comment")]
    async fn flag_comment(
        &self,
        interaction_id: InteractionId,
        flagger_id: UserId,
        policy_id: PolicyId,
        reason: String,
    ) -> Result<FlagOpened, ResourceError>;

    #[doc = "Post a message in a debate"]
    #[method(name = "post_debate_message")]
    async fn post_debate_message(
        &self,
        debate_id: DebateId,
        author_id: UserId,
        message: String,
    ) -> Result<DebateMessageModel, ResourceError>;

    #[doc = "Close a debate with a decision"]
    #[method(name = "close_debate")]
    async fn close_debate(
        &self,
        debate_id: DebateId,
        admin_id: UserId,
        decision: String,
        penalty: Option<PenaltyDecision>,
    ) -> Result<ClosedDebate, ResourceError>;

    #[doc = "Get a debate"]
    #[method(name = "get_debate")]
    async fn get_debate(
        &self,
        debate_id: DebateId,
        viewer_id: UserId,
    ) -> Result<CommentDebateModel, ResourceError>;

    #[doc = "List a debate's messages"]
    #[method(name = "list_debate_messages")]
    async fn list_debate_messages(
        &self,
        debate_id: DebateId,
        viewer_id: UserId,
    ) -> Result<Vec<DebateMessageModel>, ResourceError>;

    #[doc = "List a group's flags"]
    #[method(name = "list_flags")]
    async fn list_flags(
        &self,
        group_id: GroupId,
        admin_id: UserId,
        status: Option<FlagStatus>,
    ) -> Result<Vec<FlaggedCommentModel>, ResourceError>;
}

#[async_trait]
impl DebatesServer for DebatesService {
    async fn flag_comment(
        &self,
        _ctx: RequestContext,
        interaction_id: InteractionId,
        flagger_id: UserId,
        policy_id: PolicyId,
        reason: String,
    ) -> Result<FlagOpened, ResourceError> {
        Ok(self
            ._flag_comment(interaction_id, flagger_id, policy_id, reason, Utc::now())
            .await?)
    }

    async fn post_debate_message(
        &self,
        _ctx: RequestContext,
        debate_id: DebateId,
        author_id: UserId,
        message: String,
    ) -> Result<DebateMessageModel, ResourceError> {
        Ok(self
            ._post_debate_message(debate_id, author_id, message, Utc::now())
            .await?)
    }

    async fn close_debate(
        &self,
        _ctx: RequestContext,
        debate_id: DebateId,
        admin_id: UserId,
        decision: String,
        penalty: Option<PenaltyDecision>,
    ) -> Result<ClosedDebate, ResourceError> {
        Ok(self
            ._close_debate(debate_id, admin_id, decision, penalty, Utc::now())
            .await?)
    }

    async fn get_debate(
        &self,
        _ctx: RequestContext,
        debate_id: DebateId,
        viewer_id: UserId,
    ) -> Result<CommentDebateModel, ResourceError> {
        Ok(self._get_debate(debate_id, viewer_id).await?)
    }

    async fn list_debate_messages(
        &self,
        _ctx: RequestContext,
        debate_id: DebateId,
        viewer_id: UserId,
    ) -> Result<Vec<DebateMessageModel>, ResourceError> {
        Ok(self._list_debate_messages(debate_id, viewer_id).await?)
    }

    async fn list_flags(
        &self,
        _ctx: RequestContext,
        group_id: GroupId,
        admin_id: UserId,
        status: Option<FlagStatus>,
    ) -> Result<Vec<FlaggedCommentModel>, ResourceError> {
        Ok(self._list_flags(group_id, admin_id, status).await?)
    }
}
