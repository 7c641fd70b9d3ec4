use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use thiserror::Error;
use zel_core::prelude::*;

use crate::{
    entity::prelude::*,
    error::ErrorKind,
    ids::{DebateId, GroupId, PenaltyId, UserId},
    models::penalty::{self, PenaltyDurationError},
    service::authz::{self, AuthzError},
};

#[derive(Debug, Error)]
pub enum PenaltiesServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error("target user is not a member of this group")]
    MemberNotFound,

    #[error(transparent)]
    InvalidDuration(#[from] PenaltyDurationError),
}

impl PenaltiesServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PenaltiesServiceError::DbError(_) => ErrorKind::Infra,
            PenaltiesServiceError::Authz(error) => error.kind(),
            PenaltiesServiceError::MemberNotFound => ErrorKind::NotFound,
            PenaltiesServiceError::InvalidDuration(_) => ErrorKind::Validation,
        }
    }
}

impl From<PenaltiesServiceError> for ResourceError {
    fn from(error: PenaltiesServiceError) -> Self {
        match error.kind() {
            ErrorKind::Infra => ResourceError::infra(error),
            _ => ResourceError::app(error),
        }
    }
}

/// Everything needed to write one ledger entry.
#[derive(Debug, Clone)]
pub struct PenaltyRequest {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub penalty_type: PenaltyType,
    pub duration_days: Option<u32>,
    pub reason: String,
    pub issued_by: UserId,
    pub debate_id: Option<DebateId>,
}

/// Write a ledger entry through `conn`. Authorization is the caller's job.
pub(crate) async fn issue_in<C: ConnectionTrait>(
    conn: &C,
    request: PenaltyRequest,
    now: DateTime<Utc>,
) -> Result<MemberPenaltyModel, PenaltiesServiceError> {
    penalty::validate_duration(request.penalty_type, request.duration_days)?;

    let duration_days = request
        .duration_days
        .map(i32::try_from)
        .transpose()
        .map_err(|_| PenaltyDurationError::TooLong)?;

    let entry = MemberPenaltyActiveModel {
        id: Set(PenaltyId::new()),
        group_id: Set(request.group_id),
        user_id: Set(request.user_id),
        penalty_type: Set(request.penalty_type),
        duration_days: Set(duration_days),
        reason: Set(request.reason),
        issued_by: Set(request.issued_by),
        debate_id: Set(request.debate_id),
        issued_at: Set(now),
        expires_at: Set(penalty::expires_at(now, request.duration_days)),
    };

    let result = MemberPenalty::insert(entry).exec_with_returning(conn).await?;

    tracing::info!(
        penalty_id = %result.id,
        group_id = %result.group_id,
        user_id = %result.user_id,
        penalty_type = ?result.penalty_type,
        expires_at = ?result.expires_at,
        "penalty issued"
    );
    Ok(result)
}

#[derive(Clone)]
pub struct PenaltiesService {
    db: DatabaseConnection,
}

impl PenaltiesService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Issue a penalty directly (admins and co-admins only)
    #[allow(clippy::too_many_arguments)]
    pub async fn _issue_penalty(
        &self,
        group_id: GroupId,
        issued_by: UserId,
        user_id: UserId,
        penalty_type: PenaltyType,
        duration_days: Option<u32>,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<MemberPenaltyModel, PenaltiesServiceError> {
        authz::require_admin(&self.db, group_id, issued_by).await?;

        if authz::role_of(&self.db, group_id, user_id).await?.is_none() {
            return Err(PenaltiesServiceError::MemberNotFound);
        }

        let request = PenaltyRequest {
            group_id,
            user_id,
            penalty_type,
            duration_days,
            reason,
            issued_by,
            debate_id: None,
        };

        issue_in(&self.db, request, now).await
    }

    /// List a group's penalties, optionally for one member (admins and co-admins only)
    pub async fn _list_penalties(
        &self,
        group_id: GroupId,
        viewer_id: UserId,
        user_id: Option<UserId>,
    ) -> Result<Vec<MemberPenaltyModel>, PenaltiesServiceError> {
        authz::require_admin(&self.db, group_id, viewer_id).await?;

        let mut query = MemberPenalty::find().filter(MemberPenaltyColumn::GroupId.eq(group_id));
        if let Some(user_id) = user_id {
            query = query.filter(MemberPenaltyColumn::UserId.eq(user_id));
        }

        let penalties = query
            .order_by_desc(MemberPenaltyColumn::IssuedAt)
            .all(&self.db)
            .await?;

        Ok(penalties)
    }

    /// Penalties currently in force against a member
    pub async fn _active_penalties(
        &self,
        group_id: GroupId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<MemberPenaltyModel>, PenaltiesServiceError> {
        let penalties = MemberPenalty::find()
            .filter(MemberPenaltyColumn::GroupId.eq(group_id))
            .filter(MemberPenaltyColumn::UserId.eq(user_id))
            .order_by_desc(MemberPenaltyColumn::IssuedAt)
            .all(&self.db)
            .await?;

        Ok(penalties.into_iter().filter(|p| p.is_active(now)).collect())
    }
}

#[zel_service(name = "penalties")]
trait Penalties {
    #[doc = "Issue a penalty against a group member"]
    #[method(name = "issue_penalty")]
    async fn issue_penalty(
        &self,
        group_id: GroupId,
        issued_by: UserId,
        user_id: UserId,
        penalty_type: PenaltyType,
        duration_days: Option<u32>,
        reason: String,
    ) -> Result<MemberPenaltyModel, ResourceError>;

    #[doc = "List a group's penalties"]
    #[method(name = "list_penalties")]
    async fn list_penalties(
        &self,
        group_id: GroupId,
        viewer_id: UserId,
        user_id: Option<UserId>,
    ) -> Result<Vec<MemberPenaltyModel>, ResourceError>;

    #[doc = "Penalties currently in force against a member"]
    #[method(name = "active_penalties")]
    async fn active_penalties(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<Vec<MemberPenaltyModel>, ResourceError>;
}

#[async_trait]
impl PenaltiesServer for PenaltiesService {
    async fn issue_penalty(
        &self,
        _ctx: RequestContext,
        group_id: GroupId,
        issued_by: UserId,
        user_id: UserId,
        penalty_type: PenaltyType,
        duration_days: Option<u32>,
        reason: String,
    ) -> Result<MemberPenaltyModel, ResourceError> {
        Ok(self
            ._issue_penalty(
                group_id,
                issued_by,
                user_id,
                penalty_type,
                duration_days,
                reason,
                Utc::now(),
            )
            .await?)
    }

    async fn list_penalties(
        &self,
        _ctx: RequestContext,
        group_id: GroupId,
        viewer_id: UserId,
        user_id: Option<UserId>,
    ) -> Result<Vec<MemberPenaltyModel>, ResourceError> {
        Ok(self._list_penalties(group_id, viewer_id, user_id).await?)
    }

    async fn active_penalties(
        &self,
        _ctx: RequestContext,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<Vec<MemberPenaltyModel>, ResourceError> {
        Ok(self._active_penalties(group_id, user_id, Utc::now()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::migrator::Migrator;
    use chrono::Duration;
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    struct Fixture {
        service: PenaltiesService,
        group_id: GroupId,
        admin: UserId,
        co_admin: UserId,
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
        let co_admin = UserId::new();
        let member = UserId::new();

        Group::insert(GroupActiveModel {
            id: Set(group_id),
            owner_id: Set(admin),
            name: Set("Ledger".to_string()),
            created_at: Set(Utc::now()),
        })
        .exec(&db)
        .await
        .unwrap();

        for (user_id, role) in [
            (admin, MemberRole::Admin),
            (co_admin, MemberRole::CoAdmin),
            (member, MemberRole::Member),
        ] {
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
            service: PenaltiesService::new(db),
            group_id,
            admin,
            co_admin,
            member,
        }
    }

    #[tokio::test]
    async fn test_timed_mute_expires_at_read_time() {
        let fx = setup_test_service().await;
        let now = Utc::now();

        let mute = fx
            .service
            ._issue_penalty(
                fx.group_id,
                fx.co_admin,
                fx.member,
                PenaltyType::Mute,
                Some(7),
                "spam".into(),
                now,
            )
            .await
            .expect("Co-admins should issue penalties");

        assert_eq!(mute.duration_days, Some(7));
        assert_eq!(mute.expires_at, Some(now + Duration::days(7)));
        assert_eq!(mute.debate_id, None);

        let active = fx
            .service
            ._active_penalties(fx.group_id, fx.member, now + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);

        let active = fx
            .service
            ._active_penalties(fx.group_id, fx.member, now + Duration::days(7))
            .await
            .unwrap();
        assert!(active.is_empty(), "Mute should be inert once expired");
    }

    #[tokio::test]
    async fn test_permanent_ban_never_expires() {
        let fx = setup_test_service().await;
        let now = Utc::now();

        let ban = fx
            .service
            ._issue_penalty(
                fx.group_id,
                fx.admin,
                fx.member,
                PenaltyType::Ban,
                None,
                "abuse".into(),
                now,
            )
            .await
            .unwrap();

        assert_eq!(ban.expires_at, None);
        assert!(ban.is_active(now + Duration::days(3650)));
    }

    #[tokio::test]
    async fn test_duration_rules_are_validated() {
        let fx = setup_test_service().await;
        let now = Utc::now();

        let err = fx
            .service
            ._issue_penalty(
                fx.group_id,
                fx.admin,
                fx.member,
                PenaltyType::Mute,
                None,
                "r".into(),
                now,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = fx
            .service
            ._issue_penalty(
                fx.group_id,
                fx.admin,
                fx.member,
                PenaltyType::Warning,
                Some(2),
                "r".into(),
                now,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_members_cannot_issue_or_list() {
        let fx = setup_test_service().await;
        let now = Utc::now();

        let err = fx
            .service
            ._issue_penalty(
                fx.group_id,
                fx.member,
                fx.admin,
                PenaltyType::Warning,
                None,
                "r".into(),
                now,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = fx
            .service
            ._list_penalties(fx.group_id, fx.member, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_target_must_be_member() {
        let fx = setup_test_service().await;

        let err = fx
            .service
            ._issue_penalty(
                fx.group_id,
                fx.admin,
                UserId::new(),
                PenaltyType::Warning,
                None,
                "r".into(),
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_penalties_filters_by_member() {
        let fx = setup_test_service().await;
        let now = Utc::now();

        fx.service
            ._issue_penalty(
                fx.group_id,
                fx.admin,
                fx.member,
                PenaltyType::Warning,
                None,
                "a".into(),
                now,
            )
            .await
            .unwrap();
        fx.service
            ._issue_penalty(
                fx.group_id,
                fx.admin,
                fx.co_admin,
                PenaltyType::Warning,
                None,
                "b".into(),
                now,
            )
            .await
            .unwrap();

        let all = fx
            .service
            ._list_penalties(fx.group_id, fx.co_admin, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let one = fx
            .service
            ._list_penalties(fx.group_id, fx.admin, Some(fx.member))
            .await
            .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].reason, "a");
    }
}
