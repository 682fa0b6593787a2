//! Shared in-memory wiring for handler tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use secrecy::SecretString;

use crate::adapters::identity::LocalIdentityProvider;
use crate::adapters::memory::{
    InMemoryAuditLog, InMemoryInvitationStore, InMemoryMembershipStore, InMemoryTenantStore,
    InMemoryUserDirectory,
};
use crate::application::{Authorizer, ClaimsReconciler, InvitationValidator, RetryPolicy};
use crate::domain::claims::SessionClaims;
use crate::domain::foundation::{Contact, DomainError, TenantId, Timestamp, UserId};
use crate::domain::membership::{Membership, MembershipStatus, Role};
use crate::domain::tenancy::{Tenant, User};
use crate::ports::{IdentityProvider, MembershipStore, TenantStore, UserDirectory};

pub struct World {
    pub memberships: Arc<InMemoryMembershipStore>,
    pub invitations: Arc<InMemoryInvitationStore>,
    pub tenants: Arc<InMemoryTenantStore>,
    pub users: Arc<InMemoryUserDirectory>,
    pub audit: Arc<InMemoryAuditLog>,
    pub identity: Arc<LocalIdentityProvider>,
    pub reconciler: Arc<ClaimsReconciler>,
    pub authorizer: Authorizer,
    pub validator: Arc<InvitationValidator>,
}

impl World {
    pub fn new() -> Self {
        let memberships = Arc::new(InMemoryMembershipStore::new());
        let invitations = Arc::new(InMemoryInvitationStore::new());
        let tenants = Arc::new(InMemoryTenantStore::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        let audit = Arc::new(InMemoryAuditLog::new());
        let identity = Arc::new(LocalIdentityProvider::new(
            "handler-tests",
            &SecretString::new("handler-test-secret-0123456789abcdef".to_string()),
            3600,
        ));
        let reconciler = Arc::new(ClaimsReconciler::new(
            memberships.clone(),
            tenants.clone(),
            users.clone(),
            identity.clone(),
            RetryPolicy {
                max_attempts: 2,
                initial_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(2),
            },
        ));
        let authorizer = Authorizer::new(users.clone(), memberships.clone());
        let validator = Arc::new(InvitationValidator::new(
            invitations.clone(),
            memberships.clone(),
            users.clone(),
            audit.clone(),
        ));
        Self {
            memberships,
            invitations,
            tenants,
            users,
            audit,
            identity,
            reconciler,
            authorizer,
            validator,
        }
    }

    pub async fn tenant(&self, namespace: &str) -> TenantId {
        let tenant = Tenant::create(
            TenantId::new(),
            namespace.to_uppercase(),
            namespace,
            UserId::system(),
            Timestamp::now(),
        )
        .unwrap();
        self.tenants.insert(&tenant).await.unwrap();
        tenant.id
    }

    pub async fn user(&self, id: &str, platform_role: Option<Role>) -> UserId {
        let user_id = UserId::new(id).unwrap();
        let mut user = User::new(user_id.clone(), id, vec![Self::email_of(id)]).unwrap();
        if let Some(role) = platform_role {
            user = user.with_platform_role(role);
        }
        self.users.upsert(&user).await.unwrap();
        user_id
    }

    pub fn email_of(id: &str) -> Contact {
        Contact::email(format!("{}@example.com", id)).unwrap()
    }

    pub async fn member(&self, user_id: &UserId, tenant_id: TenantId, role: Role) -> Membership {
        let m = Membership::active(user_id.clone(), tenant_id, role, None, Timestamp::now());
        self.memberships.upsert(&m).await.unwrap();
        m
    }

    pub async fn membership(&self, user_id: &UserId, tenant_id: TenantId) -> Option<Membership> {
        self.memberships.find(user_id, tenant_id).await.unwrap()
    }

    pub async fn stored_claims(&self, user_id: &UserId) -> Option<SessionClaims> {
        self.identity
            .get_claims(user_id)
            .await
            .unwrap()
            .map(|v| SessionClaims::from_payload(&v).unwrap())
    }
}

/// Membership store whose next `n` upserts fail with `DatabaseError`.
pub struct FlakyMemberships {
    inner: Arc<InMemoryMembershipStore>,
    failing_upserts: AtomicU32,
}

impl FlakyMemberships {
    pub fn new(inner: Arc<InMemoryMembershipStore>, failing_upserts: u32) -> Self {
        Self {
            inner,
            failing_upserts: AtomicU32::new(failing_upserts),
        }
    }
}

#[async_trait]
impl MembershipStore for FlakyMemberships {
    async fn upsert(&self, membership: &Membership) -> Result<(), DomainError> {
        let left = self.failing_upserts.load(Ordering::SeqCst);
        if left > 0 {
            self.failing_upserts.store(left - 1, Ordering::SeqCst);
            return Err(DomainError::database("connection reset"));
        }
        self.inner.upsert(membership).await
    }

    async fn find(
        &self,
        user_id: &UserId,
        tenant_id: TenantId,
    ) -> Result<Option<Membership>, DomainError> {
        self.inner.find(user_id, tenant_id).await
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Membership>, DomainError> {
        self.inner.list_by_user(user_id).await
    }

    async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<Membership>, DomainError> {
        self.inner.list_by_tenant(tenant_id).await
    }

    async fn list_by_status(
        &self,
        status: MembershipStatus,
    ) -> Result<Vec<Membership>, DomainError> {
        self.inner.list_by_status(status).await
    }

    async fn delete(&self, user_id: &UserId, tenant_id: TenantId) -> Result<bool, DomainError> {
        self.inner.delete(user_id, tenant_id).await
    }

    async fn delete_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<UserId>, DomainError> {
        self.inner.delete_by_tenant(tenant_id).await
    }

    async fn get_active_tenant(&self, user_id: &UserId) -> Result<Option<TenantId>, DomainError> {
        self.inner.get_active_tenant(user_id).await
    }

    async fn set_active_tenant(
        &self,
        user_id: &UserId,
        tenant_id: Option<TenantId>,
    ) -> Result<(), DomainError> {
        self.inner.set_active_tenant(user_id, tenant_id).await
    }
}
