use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use thiserror::Error;
use zel_core::prelude::*;

use crate::{
    entity::prelude::*,
    error::ErrorKind,
    ids::{GroupId, UserId},
    service::authz::{self, AuthzError},
};

#[derive(Debug, Error)]
pub enum GroupsServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error("group not found")]
    GroupNotFound,

    #[error("member not found")]
    MemberNotFound,

    #[error("user is already a member of this group")]
    AlreadyMember,

    #[error("the group owner cannot be removed or demoted")]
    OwnerProtected,
}

impl GroupsServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GroupsServiceError::DbError(_) => ErrorKind::Infra,
            GroupsServiceError::Authz(error) => error.kind(),
            GroupsServiceError::GroupNotFound | GroupsServiceError::MemberNotFound => {
                ErrorKind::NotFound
            }
            GroupsServiceError::AlreadyMember => ErrorKind::Conflict,
            GroupsServiceError::OwnerProtected => ErrorKind::Validation,
        }
    }
}

impl From<GroupsServiceError> for ResourceError {
    fn from(error: GroupsServiceError) -> Self {
        match error.kind() {
            ErrorKind::Infra => ResourceError::infra(error),
            _ => ResourceError::app(error),
        }
    }
}

#[derive(Clone)]
pub struct GroupsService {
    db: DatabaseConnection,
}

impl GroupsService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a new group; the owner becomes its first admin
    pub async fn _create_group(
        &self,
        owner_id: UserId,
        name: String,
        now: DateTime<Utc>,
    ) -> Result<GroupModel, GroupsServiceError> {
        let txn = self.db.begin().await?;

        let group_id = GroupId::new();
        let group = GroupActiveModel {
            id: Set(group_id),
            owner_id: Set(owner_id),
            name: Set(name),
            created_at: Set(now),
        };

        let group_result = Group::insert(group).exec_with_returning(&txn).await?;

        let admin = GroupMemberActiveModel {
            group_id: Set(group_id),
            user_id: Set(owner_id),
            role: Set(MemberRole::Admin),
            joined_at: Set(now),
        };
        GroupMember::insert(admin).exec(&txn).await?;

        txn.commit().await?;

        tracing::info!(%group_id, %owner_id, "group created");
        Ok(group_result)
    }

    /// Get a specific group by ID
    pub async fn _get_group(&self, group_id: GroupId) -> Result<GroupModel, GroupsServiceError> {
        Group::find_by_id(group_id)
            .one(&self.db)
            .await?
            .ok_or(GroupsServiceError::GroupNotFound)
    }

    /// Add a user to a group with the given role (admins only)
    pub async fn _add_member(
        &self,
        group_id: GroupId,
        actor_id: UserId,
        user_id: UserId,
        role: MemberRole,
        now: DateTime<Utc>,
    ) -> Result<GroupMemberModel, GroupsServiceError> {
        self._get_group(group_id).await?;
        authz::require_primary_admin(&self.db, group_id, actor_id).await?;

        if authz::role_of(&self.db, group_id, user_id).await?.is_some() {
            return Err(GroupsServiceError::AlreadyMember);
        }

        let member = GroupMemberActiveModel {
            group_id: Set(group_id),
            user_id: Set(user_id),
            role: Set(role),
            joined_at: Set(now),
        };

        let result = GroupMember::insert(member)
            .exec_with_returning(&self.db)
            .await?;

        Ok(result)
    }

    /// Change a member's role (admins only)
    pub async fn _set_role(
        &self,
        group_id: GroupId,
        actor_id: UserId,
        user_id: UserId,
        role: MemberRole,
    ) -> Result<GroupMemberModel, GroupsServiceError> {
        let group = self._get_group(group_id).await?;
        authz::require_primary_admin(&self.db, group_id, actor_id).await?;

        if group.owner_id == user_id && role != MemberRole::Admin {
            return Err(GroupsServiceError::OwnerProtected);
        }

        let member = GroupMember::find_by_id((group_id, user_id))
            .one(&self.db)
            .await?
            .ok_or(GroupsServiceError::MemberNotFound)?;

        let mut member_active: GroupMemberActiveModel = member.into();
        member_active.role = Set(role);

        let updated = member_active.update(&self.db).await?;
        Ok(updated)
    }

    /// Remove a member from a group (admins only)
    pub async fn _remove_member(
        &self,
        group_id: GroupId,
        actor_id: UserId,
        user_id: UserId,
    ) -> Result<(), GroupsServiceError> {
        let group = self._get_group(group_id).await?;
        authz::require_primary_admin(&self.db, group_id, actor_id).await?;

        if group.owner_id == user_id {
            return Err(GroupsServiceError::OwnerProtected);
        }

        let result = GroupMember::delete_by_id((group_id, user_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(GroupsServiceError::MemberNotFound);
        }

        Ok(())
    }

    /// List all members of a group
    pub async fn _list_members(
        &self,
        group_id: GroupId,
    ) -> Result<Vec<GroupMemberModel>, GroupsServiceError> {
        let members = GroupMember::find()
            .filter(GroupMemberColumn::GroupId.eq(group_id))
            .order_by_asc(GroupMemberColumn::JoinedAt)
            .all(&self.db)
            .await?;

        Ok(members)
    }

    /// Role of a user in a group, if they belong to it
    pub async fn _role_of(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<Option<MemberRole>, GroupsServiceError> {
        Ok(authz::role_of(&self.db, group_id, user_id).await?)
    }
}

#[zel_service(name = "groups")]
trait Groups {
    #[doc = "Create a new group owned by the calling user"]
    #[method(name = "create_group")]
    async fn create_group(
        &self,
        owner_id: UserId,
        name: String,
    ) -> Result<GroupModel, ResourceError>;

    #[doc = "Get a specific group by ID"]
    #[method(name = "get_group")]
    async fn get_group(&self, group_id: GroupId) -> Result<GroupModel, ResourceError>;

    #[doc = "Add a member to a group"]
    #[method(name = "add_member")]
    async fn add_member(
        &self,
        group_id: GroupId,
        actor_id: UserId,
        user_id: UserId,
        role: MemberRole,
    ) -> Result<GroupMemberModel, ResourceError>;

    #[doc = "Change a member's role"]
    #[method(name = "set_role")]
    async fn set_role(
        &self,
        group_id: GroupId,
        actor_id: UserId,
        user_id: UserId,
        role: MemberRole,
    ) -> Result<GroupMemberModel, ResourceError>;

    #[doc = "Remove a member from a group"]
    #[method(name = "remove_member")]
    async fn remove_member(
        &self,
        group_id: GroupId,
        actor_id: UserId,
        user_id: UserId,
    ) -> Result<(), ResourceError>;

    #[doc = "List all members of a group"]
    #[method(name = "list_members")]
    async fn list_members(&self, group_id: GroupId) -> Result<Vec<GroupMemberModel>, ResourceError>;

    #[doc = "Role of a user in a group"]
    #[method(name = "role_of")]
    async fn role_of(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<Option<MemberRole>, ResourceError>;
}

#[async_trait]
impl GroupsServer for GroupsService {
    async fn create_group(
        &self,
        _ctx: RequestContext,
        owner_id: UserId,
        name: String,
    ) -> Result<GroupModel, ResourceError> {
        Ok(self._create_group(owner_id, name, Utc::now()).await?)
    }

    async fn get_group(
        &self,
        _ctx: RequestContext,
        group_id: GroupId,
    ) -> Result<GroupModel, ResourceError> {
        Ok(self._get_group(group_id).await?)
    }

    async fn add_member(
        &self,
        _ctx: RequestContext,
        group_id: GroupId,
        actor_id: UserId,
        user_id: UserId,
        role: MemberRole,
    ) -> Result<GroupMemberModel, ResourceError> {
        Ok(self
            ._add_member(group_id, actor_id, user_id, role, Utc::now())
            .await?)
    }

    async fn set_role(
        &self,
        _ctx: RequestContext,
        group_id: GroupId,
        actor_id: UserId,
        user_id: UserId,
        role: MemberRole,
    ) -> Result<GroupMemberModel, ResourceError> {
        Ok(self._set_role(group_id, actor_id, user_id, role).await?)
    }

    async fn remove_member(
        &self,
        _ctx: RequestContext,
        group_id: GroupId,
        actor_id: UserId,
        user_id: UserId,
    ) -> Result<(), ResourceError> {
        Ok(self._remove_member(group_id, actor_id, user_id).await?)
    }

    async fn list_members(
        &self,
        _ctx: RequestContext,
        group_id: GroupId,
    ) -> Result<Vec<GroupMemberModel>, ResourceError> {
        Ok(self._list_members(group_id).await?)
    }

    async fn role_of(
        &self,
        _ctx: RequestContext,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<Option<MemberRole>, ResourceError> {
        Ok(self._role_of(group_id, user_id).await?)
    }
}
