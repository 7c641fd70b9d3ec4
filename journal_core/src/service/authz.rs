//! Role checks shared by every mutating moderation operation.
//!
//! The membership table is the `(group, user) -> role` capability: each
//! check takes the connection it should read through, so callers running
//! inside a transaction see their own uncommitted writes.

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use thiserror::Error;

use crate::{
    entity::prelude::*,
    error::ErrorKind,
    ids::{GroupId, UserId},
};

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("forbidden: not a member of this group")]
    NotMember,

    #[error("forbidden: banned from this group")]
    Banned,

    #[error("forbidden: muted in this group")]
    Muted,

    #[error("forbidden: admin or co-admin role required")]
    NotAdmin,

    #[error("forbidden: group admin role required")]
    NotPrimaryAdmin,
}

impl AuthzError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthzError::DbError(_) => ErrorKind::Infra,
            _ => ErrorKind::Forbidden,
        }
    }
}

pub async fn role_of<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
    user_id: UserId,
) -> Result<Option<MemberRole>, DbErr> {
    let member = GroupMember::find_by_id((group_id, user_id)).one(conn).await?;
    Ok(member.map(|m| m.role))
}

/// Whether `user_id` carries an unexpired penalty of `penalty_type`.
pub async fn has_active_penalty<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
    user_id: UserId,
    penalty_type: PenaltyType,
    now: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let penalties = MemberPenalty::find()
        .filter(MemberPenaltyColumn::GroupId.eq(group_id))
        .filter(MemberPenaltyColumn::UserId.eq(user_id))
        .filter(MemberPenaltyColumn::PenaltyType.eq(penalty_type))
        .all(conn)
        .await?;

    Ok(penalties.iter().any(|p| p.is_active(now)))
}

/// Any role will do, but an active ban counts as not being a member.
pub async fn require_membership<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
    user_id: UserId,
    now: DateTime<Utc>,
) -> Result<MemberRole, AuthzError> {
    let Some(role) = role_of(conn, group_id, user_id).await? else {
        tracing::debug!(%group_id, %user_id, "membership check failed");
        return Err(AuthzError::NotMember);
    };

    if has_active_penalty(conn, group_id, user_id, PenaltyType::Ban, now).await? {
        tracing::debug!(%group_id, %user_id, "member is banned");
        return Err(AuthzError::Banned);
    }

    Ok(role)
}

/// Membership plus the right to speak: muted members may read but not
/// propose, vote, flag or post. Admins and co-admins are never muted out.
pub async fn require_voice<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
    user_id: UserId,
    now: DateTime<Utc>,
) -> Result<MemberRole, AuthzError> {
    let role = require_membership(conn, group_id, user_id, now).await?;

    if !role.is_moderator()
        && has_active_penalty(conn, group_id, user_id, PenaltyType::Mute, now).await?
    {
        tracing::debug!(%group_id, %user_id, "member is muted");
        return Err(AuthzError::Muted);
    }

    Ok(role)
}

/// Admin or co-admin. Used for debates and penalties.
pub async fn require_admin<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
    user_id: UserId,
) -> Result<MemberRole, AuthzError> {
    match role_of(conn, group_id, user_id).await? {
        Some(role) if role.is_moderator() => Ok(role),
        _ => {
            tracing::debug!(%group_id, %user_id, "admin check failed");
            Err(AuthzError::NotAdmin)
        }
    }
}

/// Full admin only; co-admins are refused. Used for policy creation and
/// membership management.
pub async fn require_primary_admin<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
    user_id: UserId,
) -> Result<(), AuthzError> {
    match role_of(conn, group_id, user_id).await? {
        Some(MemberRole::Admin) => Ok(()),
        _ => {
            tracing::debug!(%group_id, %user_id, "primary admin check failed");
            Err(AuthzError::NotPrimaryAdmin)
        }
    }
}
