//! Role checks shared by the lifecycle handlers.
//!
//! Platform admins pass every tenant check. Anyone else needs an active,
//! managing membership in the tenant being acted on.

use std::sync::Arc;

use crate::domain::foundation::{TenantId, UserId};
use crate::domain::membership::{Membership, Role, WorkspaceError};
use crate::domain::tenancy::User;
use crate::ports::{MembershipStore, UserDirectory};

/// The authorized caller of an operation.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user: User,

    /// Membership in the tenant being acted on, if any.
    pub membership: Option<Membership>,
}

impl Actor {
    pub fn id(&self) -> &UserId {
        &self.user.id
    }

    /// Role used for grant checks. A platform role outranks the tenant role.
    pub fn effective_role(&self) -> Option<Role> {
        self.user
            .platform_role
            .or_else(|| self.membership.as_ref().filter(|m| m.is_active()).map(|m| m.role))
    }

    pub fn can_grant(&self, role: Role) -> bool {
        self.effective_role().is_some_and(|r| r.can_grant(role))
    }
}

#[derive(Clone)]
pub struct Authorizer {
    users: Arc<dyn UserDirectory>,
    memberships: Arc<dyn MembershipStore>,
}

impl Authorizer {
    pub fn new(users: Arc<dyn UserDirectory>, memberships: Arc<dyn MembershipStore>) -> Self {
        Self { users, memberships }
    }

    /// Requires a platform admin or an active managing member of `tenant_id`.
    pub async fn require_tenant_admin(
        &self,
        actor_id: &UserId,
        tenant_id: TenantId,
    ) -> Result<Actor, WorkspaceError> {
        let user = self.load(actor_id).await?;
        let membership = self.memberships.find(actor_id, tenant_id).await?;

        let actor = Actor { user, membership };
        if actor.user.is_platform_admin() {
            return Ok(actor);
        }

        match &actor.membership {
            Some(m) if m.is_active() && m.role.can_manage_members() => Ok(actor),
            _ => {
                tracing::debug!(actor_id = %actor_id, tenant_id = %tenant_id, "Tenant admin check failed");
                Err(WorkspaceError::permission_denied(format!(
                    "user {} cannot manage members of tenant {}",
                    actor_id, tenant_id
                )))
            }
        }
    }

    pub async fn require_platform_admin(&self, actor_id: &UserId) -> Result<User, WorkspaceError> {
        let user = self.load(actor_id).await?;
        if !user.is_platform_admin() {
            return Err(WorkspaceError::permission_denied(format!(
                "user {} is not a platform admin",
                actor_id
            )));
        }
        Ok(user)
    }

    pub async fn require_super_admin(&self, actor_id: &UserId) -> Result<User, WorkspaceError> {
        let user = self.load(actor_id).await?;
        if !user.is_super_admin() {
            return Err(WorkspaceError::permission_denied(format!(
                "user {} is not a super admin",
                actor_id
            )));
        }
        Ok(user)
    }

    async fn load(&self, actor_id: &UserId) -> Result<User, WorkspaceError> {
        self.users.find(actor_id).await?.ok_or_else(|| {
            WorkspaceError::permission_denied(format!("unknown actor {}", actor_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryMembershipStore, InMemoryUserDirectory};
    use crate::domain::foundation::{Contact, Timestamp};

    async fn setup() -> (Authorizer, Arc<InMemoryUserDirectory>, Arc<InMemoryMembershipStore>) {
        let users = Arc::new(InMemoryUserDirectory::new());
        let memberships = Arc::new(InMemoryMembershipStore::new());
        (
            Authorizer::new(users.clone(), memberships.clone()),
            users,
            memberships,
        )
    }

    async fn add_user(users: &InMemoryUserDirectory, id: &str, platform: Option<Role>) -> UserId {
        let user_id = UserId::new(id).unwrap();
        let mut user = User::new(
            user_id.clone(),
            id,
            vec![Contact::email(format!("{}@example.com", id)).unwrap()],
        )
        .unwrap();
        if let Some(role) = platform {
            user = user.with_platform_role(role);
        }
        users.upsert(&user).await.unwrap();
        user_id
    }

    #[tokio::test]
    async fn platform_admin_passes_tenant_check_without_membership() {
        let (auth, users, _) = setup().await;
        let admin = add_user(&users, "root", Some(Role::Admin)).await;

        let actor = auth.require_tenant_admin(&admin, TenantId::new()).await.unwrap();
        assert_eq!(actor.effective_role(), Some(Role::Admin));
    }

    #[tokio::test]
    async fn partner_admin_passes_only_in_own_tenant() {
        let (auth, users, memberships) = setup().await;
        let pa = add_user(&users, "pa", None).await;
        let tenant = TenantId::new();
        memberships
            .upsert(&Membership::active(pa.clone(), tenant, Role::PartnerAdmin, None, Timestamp::now()))
            .await
            .unwrap();

        let actor = auth.require_tenant_admin(&pa, tenant).await.unwrap();
        assert!(actor.can_grant(Role::Employee));
        assert!(!actor.can_grant(Role::Admin));

        let err = auth.require_tenant_admin(&pa, TenantId::new()).await.unwrap_err();
        assert!(matches!(err, WorkspaceError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn suspended_partner_admin_is_denied() {
        let (auth, users, memberships) = setup().await;
        let pa = add_user(&users, "pa", None).await;
        let tenant = TenantId::new();
        let mut m = Membership::active(pa.clone(), tenant, Role::PartnerAdmin, None, Timestamp::now());
        m.suspend(UserId::new("root").unwrap(), None, Timestamp::now()).unwrap();
        memberships.upsert(&m).await.unwrap();

        assert!(auth.require_tenant_admin(&pa, tenant).await.is_err());
    }

    #[tokio::test]
    async fn employee_is_denied() {
        let (auth, users, memberships) = setup().await;
        let emp = add_user(&users, "emp", None).await;
        let tenant = TenantId::new();
        memberships
            .upsert(&Membership::active(emp.clone(), tenant, Role::Employee, None, Timestamp::now()))
            .await
            .unwrap();

        assert!(auth.require_tenant_admin(&emp, tenant).await.is_err());
    }

    #[tokio::test]
    async fn super_admin_check_rejects_plain_admin() {
        let (auth, users, _) = setup().await;
        let admin = add_user(&users, "admin", Some(Role::Admin)).await;
        let root = add_user(&users, "root", Some(Role::SuperAdmin)).await;

        assert!(auth.require_platform_admin(&admin).await.is_ok());
        assert!(auth.require_super_admin(&admin).await.is_err());
        assert!(auth.require_super_admin(&root).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_actor_is_denied() {
        let (auth, _, _) = setup().await;
        let err = auth
            .require_platform_admin(&UserId::new("ghost").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::PermissionDenied(_)));
    }
}
