//! End-to-end membership lifecycle over the in-memory adapters.
//!
//! Drives the public `ActionDispatcher` the way the HTTP layer does and
//! inspects the stores and the identity provider directly.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::{json, Value};

use workspace_access::adapters::memory::{
    InMemoryAuditLog, InMemoryInvitationStore, InMemoryMembershipStore, InMemoryTenantStore,
    InMemoryUserDirectory,
};
use workspace_access::adapters::LocalIdentityProvider;
use workspace_access::application::{
    ActionDispatcher, ActionKind, ActionRequest, ActionResponse, Dependencies,
    ExpireInvitationsCommand, InvitationPolicy, RetryPolicy,
};
use workspace_access::domain::audit::AuditAction;
use workspace_access::domain::claims::{ActiveTenant, SessionClaims};
use workspace_access::domain::foundation::{
    Contact, DomainError, ErrorCode, InvitationId, TenantId, Timestamp, UserId,
};
use workspace_access::domain::invitation::{Invitation, InvitationCode, InvitationStatus};
use workspace_access::domain::membership::{Membership, MembershipStatus, Role};
use workspace_access::domain::tenancy::User;
use workspace_access::ports::{IdentityProvider, InvitationStore, MembershipStore, UserDirectory};

// =============================================================================
// Test Infrastructure
// =============================================================================

/// Wraps the in-memory store so a test can make the next upserts fail.
struct FlakyMemberships {
    inner: Arc<InMemoryMembershipStore>,
    failing_upserts: AtomicU32,
}

impl FlakyMemberships {
    fn fail_next_upserts(&self, n: u32) {
        self.failing_upserts.store(n, Ordering::SeqCst);
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

struct Harness {
    dispatcher: ActionDispatcher,
    store: Arc<FlakyMemberships>,
    memberships: Arc<InMemoryMembershipStore>,
    invitations: Arc<InMemoryInvitationStore>,
    users: Arc<InMemoryUserDirectory>,
    audit: Arc<InMemoryAuditLog>,
    identity: Arc<LocalIdentityProvider>,
    root: UserId,
}

impl Harness {
    async fn new() -> Self {
        let memberships = Arc::new(InMemoryMembershipStore::new());
        let store = Arc::new(FlakyMemberships {
            inner: memberships.clone(),
            failing_upserts: AtomicU32::new(0),
        });
        let invitations = Arc::new(InMemoryInvitationStore::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        let audit = Arc::new(InMemoryAuditLog::new());
        let identity = Arc::new(LocalIdentityProvider::new(
            "lifecycle-tests",
            &SecretString::new("lifecycle-test-secret-0123456789abcdef".to_string()),
            3600,
        ));

        let root = UserId::new("root").unwrap();
        users
            .upsert(
                &User::new(root.clone(), "Root", vec![Contact::email("root@example.com").unwrap()])
                    .unwrap()
                    .with_platform_role(Role::SuperAdmin),
            )
            .await
            .unwrap();

        let dispatcher = ActionDispatcher::new(Dependencies {
            memberships: store.clone(),
            invitations: invitations.clone(),
            tenants: Arc::new(InMemoryTenantStore::new()),
            users: users.clone(),
            audit: audit.clone(),
            identity: identity.clone(),
            invitation_policy: InvitationPolicy::default(),
            retry_policy: RetryPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(4),
            },
        });

        Self {
            dispatcher,
            store,
            memberships,
            invitations,
            users,
            audit,
            identity,
            root,
        }
    }

    async fn act(
        &self,
        actor: &UserId,
        action: ActionKind,
        tenant: Option<TenantId>,
        target: Option<&UserId>,
        payload: Value,
    ) -> ActionResponse {
        self.dispatcher
            .dispatch(ActionRequest {
                actor_user_id: actor.clone(),
                action,
                target_tenant_id: tenant,
                target_user_id: target.cloned(),
                payload,
            })
            .await
    }

    async fn register(&self, id: &str) -> UserId {
        let user_id = UserId::new(id).unwrap();
        let resp = self
            .act(
                &user_id,
                ActionKind::RegisterUser,
                None,
                None,
                json!({ "display_name": id, "contacts": [format!("{}@example.com", id)] }),
            )
            .await;
        assert!(resp.success, "register {}: {}", id, resp.message);
        user_id
    }

    async fn create_tenant(&self, namespace: &str) -> TenantId {
        let resp = self
            .act(
                &self.root,
                ActionKind::CreateTenant,
                None,
                None,
                json!({ "name": namespace.to_uppercase(), "auth_namespace": namespace }),
            )
            .await;
        assert!(resp.success, "create tenant: {}", resp.message);
        serde_json::from_value(resp.data.unwrap()["tenant"]["id"].clone()).unwrap()
    }

    async fn invite(&self, tenant: TenantId, user: &UserId, role: &str) -> String {
        let resp = self
            .act(
                &self.root,
                ActionKind::InviteMember,
                Some(tenant),
                None,
                json!({ "contact": format!("{}@example.com", user), "role": role }),
            )
            .await;
        assert!(resp.success, "invite: {}", resp.message);
        resp.data.unwrap()["code"].as_str().unwrap().to_string()
    }

    async fn accept(&self, user: &UserId, code: &str) -> ActionResponse {
        self.act(user, ActionKind::AcceptInvitation, None, None, json!({ "code": code }))
            .await
    }

    async fn join(&self, tenant: TenantId, user: &UserId, role: &str) {
        let code = self.invite(tenant, user, role).await;
        let resp = self.accept(user, &code).await;
        assert!(resp.success, "accept: {}", resp.message);
    }

    /// Inserts a pending invitation with a fixed code, issued `age_days` ago.
    async fn seed_invitation(
        &self,
        tenant: TenantId,
        code: &str,
        email: &str,
        age_days: i64,
    ) -> InvitationId {
        let invitation = Invitation::issue(
            InvitationId::new(),
            InvitationCode::parse(code).unwrap(),
            tenant,
            Contact::email(email).unwrap(),
            Role::Employee,
            self.root.clone(),
            Timestamp::now().minus_days(age_days),
            7,
        );
        self.invitations.insert(&invitation).await.unwrap();
        invitation.id
    }

    async fn stored_claims(&self, user: &UserId) -> SessionClaims {
        let payload = self.identity.get_claims(user).await.unwrap().expect("claims written");
        serde_json::from_value(payload).unwrap()
    }
}

// =============================================================================
// Invitation codes
// =============================================================================

#[tokio::test]
async fn code_is_accepted_case_insensitively_and_only_once() {
    let h = Harness::new().await;
    let tenant = h.create_tenant("acme").await;
    let bob = h.register("bob").await;
    let carol = h.register("carol").await;
    let invitation_id = h.seed_invitation(tenant, "ABC123DE", "bob@example.com", 0).await;

    let accepted = h.accept(&bob, "abc123de").await;
    assert!(accepted.success, "{}", accepted.message);

    let membership = h.memberships.find(&bob, tenant).await.unwrap().unwrap();
    assert_eq!(membership.status, MembershipStatus::Active);
    assert_eq!(membership.role, Role::Employee);

    let invitation = h.invitations.find_by_id(invitation_id).await.unwrap().unwrap();
    assert_eq!(invitation.status, InvitationStatus::Accepted);
    assert_eq!(invitation.accepted_by, Some(bob.clone()));

    let claims = h.stored_claims(&bob).await;
    assert_eq!(claims.active_tenant, ActiveTenant::Selected { tenant_id: tenant });
    assert_eq!(claims.legacy.tenant.as_deref(), Some("acme"));

    // The consumed code is useless to anyone else.
    let reused = h.accept(&carol, "ABC123DE").await;
    assert!(!reused.success);
    assert_eq!(reused.code, Some(ErrorCode::InvitationInvalid));
    assert!(h.memberships.find(&carol, tenant).await.unwrap().is_none());
}

#[tokio::test]
async fn concurrent_accepts_of_one_code_grant_once() {
    let h = Harness::new().await;
    let tenant = h.create_tenant("acme").await;
    let bob = h.register("bob").await;
    let carol = h.register("carol").await;
    let invitation_id = h.seed_invitation(tenant, "RACE2345", "bob@example.com", 0).await;

    let (first, second) = tokio::join!(h.accept(&bob, "RACE2345"), h.accept(&carol, "RACE2345"));

    let winners = [&first, &second].iter().filter(|r| r.success).count();
    assert_eq!(winners, 1, "{} / {}", first.message, second.message);
    let loser = if first.success { &second } else { &first };
    assert_eq!(loser.code, Some(ErrorCode::InvitationInvalid));

    let members = h.memberships.list_by_tenant(tenant).await.unwrap();
    assert_eq!(members.len(), 1);
    let invitation = h.invitations.find_by_id(invitation_id).await.unwrap().unwrap();
    assert_eq!(invitation.accepted_by, Some(members[0].user_id.clone()));
    assert_eq!(h.audit.count_of(AuditAction::InvitationAccepted).await, 1);
}

#[tokio::test]
async fn accept_can_be_retried_after_a_failed_store_write() {
    let h = Harness::new().await;
    let tenant = h.create_tenant("acme").await;
    let bob = h.register("bob").await;
    let invitation_id = h.seed_invitation(tenant, "RETRY234", "bob@example.com", 0).await;

    h.store.fail_next_upserts(1);
    let failed = h.accept(&bob, "RETRY234").await;
    assert_eq!(failed.code, Some(ErrorCode::UpstreamUnavailable));
    assert!(h.memberships.find(&bob, tenant).await.unwrap().is_none());
    let invitation = h.invitations.find_by_id(invitation_id).await.unwrap().unwrap();
    assert_eq!(invitation.status, InvitationStatus::Pending);

    let retried = h.accept(&bob, "RETRY234").await;
    assert!(retried.success, "{}", retried.message);
    let membership = h.memberships.find(&bob, tenant).await.unwrap().unwrap();
    assert_eq!(membership.status, MembershipStatus::Active);
    let claims = h.stored_claims(&bob).await;
    assert_eq!(claims.active_tenant, ActiveTenant::Selected { tenant_id: tenant });
}

#[tokio::test]
async fn expired_code_fails_identically_on_every_attempt() {
    let h = Harness::new().await;
    let tenant = h.create_tenant("acme").await;
    let bob = h.register("bob").await;
    let invitation_id = h.seed_invitation(tenant, "EXP1RED0", "bob@example.com", 10).await;

    let first = h.accept(&bob, "EXP1RED0").await;
    let second = h.accept(&bob, "exp1red0").await;

    assert_eq!(first.code, Some(ErrorCode::InvitationExpired));
    assert_eq!(second.code, Some(ErrorCode::InvitationExpired));

    let invitation = h.invitations.find_by_id(invitation_id).await.unwrap().unwrap();
    assert_eq!(invitation.status, InvitationStatus::Expired);
    assert_eq!(h.audit.count_of(AuditAction::InvitationExpired).await, 1);
    assert!(h.memberships.find(&bob, tenant).await.unwrap().is_none());
}

#[tokio::test]
async fn cancelled_invitation_cannot_be_accepted() {
    let h = Harness::new().await;
    let tenant = h.create_tenant("acme").await;
    let bob = h.register("bob").await;
    let invitation_id = h.seed_invitation(tenant, "CANCEL22", "bob@example.com", 0).await;

    let cancelled = h
        .act(
            &h.root,
            ActionKind::CancelInvitation,
            None,
            None,
            json!({ "invitation_id": invitation_id }),
        )
        .await;
    assert!(cancelled.success, "{}", cancelled.message);

    let resp = h.accept(&bob, "CANCEL22").await;
    assert_eq!(resp.code, Some(ErrorCode::InvitationInvalid));
    let invitation = h.invitations.find_by_id(invitation_id).await.unwrap().unwrap();
    assert_eq!(invitation.status, InvitationStatus::Cancelled);
}

#[tokio::test]
async fn expiry_sweep_marks_overdue_invitations() {
    let h = Harness::new().await;
    let tenant = h.create_tenant("acme").await;
    let stale = h.seed_invitation(tenant, "STALE234", "x@example.com", 30).await;
    let fresh = h.seed_invitation(tenant, "FRESH234", "y@example.com", 0).await;

    let result = h
        .dispatcher
        .expiry_sweep()
        .handle(ExpireInvitationsCommand { now: Timestamp::now() })
        .await
        .unwrap();

    assert_eq!(result.expired, 1);
    let stale = h.invitations.find_by_id(stale).await.unwrap().unwrap();
    let fresh = h.invitations.find_by_id(fresh).await.unwrap().unwrap();
    assert_eq!(stale.status, InvitationStatus::Expired);
    assert_eq!(fresh.status, InvitationStatus::Pending);
}

// =============================================================================
// Memberships
// =============================================================================

#[tokio::test]
async fn at_most_one_membership_per_user_and_tenant() {
    let h = Harness::new().await;
    let tenant = h.create_tenant("acme").await;
    let bob = h.register("bob").await;

    h.join(tenant, &bob, "employee").await;

    // A second invitation to an active member is refused.
    let again = h
        .act(
            &h.root,
            ActionKind::InviteMember,
            Some(tenant),
            None,
            json!({ "contact": "bob@example.com", "role": "employee" }),
        )
        .await;
    assert_eq!(again.code, Some(ErrorCode::Conflict));

    let memberships = h.memberships.list_by_user(&bob).await.unwrap();
    assert_eq!(memberships.len(), 1);
}

#[tokio::test]
async fn deactivation_moves_active_workspace_then_clears_it() {
    let h = Harness::new().await;
    let a = h.create_tenant("alpha").await;
    let b = h.create_tenant("beta").await;
    let bob = h.register("bob").await;

    h.join(a, &bob, "employee").await;
    h.join(b, &bob, "employee").await;
    assert_eq!(
        h.memberships.get_active_tenant(&bob).await.unwrap(),
        Some(a),
        "first workspace is adopted"
    );

    let resp = h
        .act(&h.root, ActionKind::DeactivateMember, Some(a), Some(&bob), json!({ "reason": "moved" }))
        .await;
    assert!(resp.success, "{}", resp.message);

    let claims = h.stored_claims(&bob).await;
    assert_eq!(claims.active_tenant, ActiveTenant::Selected { tenant_id: b });
    assert_eq!(claims.legacy.partner_id, Some(b));
    assert!(claims.memberships.iter().all(|m| m.tenant_id != a));

    let resp = h
        .act(&h.root, ActionKind::DeactivateMember, Some(b), Some(&bob), Value::Null)
        .await;
    assert!(resp.success, "{}", resp.message);

    let claims = h.stored_claims(&bob).await;
    assert_eq!(claims.active_tenant, ActiveTenant::None);
    assert!(claims.legacy.is_cleared());
    assert!(claims.memberships.is_empty());
    assert_eq!(h.memberships.get_active_tenant(&bob).await.unwrap(), None);

    // Cleared legacy fields are explicit nulls, not missing keys.
    let payload = h.identity.get_claims(&bob).await.unwrap().unwrap();
    assert!(payload.get("tenant").is_some_and(Value::is_null));
}

#[tokio::test]
async fn admin_cannot_deactivate_themselves() {
    let h = Harness::new().await;
    let tenant = h.create_tenant("acme").await;
    let alice = h.register("alice").await;
    h.join(tenant, &alice, "partner_admin").await;

    let resp = h
        .act(&alice, ActionKind::DeactivateMember, Some(tenant), Some(&alice), Value::Null)
        .await;

    assert_eq!(resp.code, Some(ErrorCode::PermissionDenied));
    let membership = h.memberships.find(&alice, tenant).await.unwrap().unwrap();
    assert_eq!(membership.status, MembershipStatus::Active);
}

#[tokio::test]
async fn suspended_member_is_restored_by_fresh_invitation() {
    let h = Harness::new().await;
    let tenant = h.create_tenant("acme").await;
    let bob = h.register("bob").await;
    h.join(tenant, &bob, "employee").await;

    let resp = h
        .act(&h.root, ActionKind::DeactivateMember, Some(tenant), Some(&bob), Value::Null)
        .await;
    assert!(resp.success);

    let code = h.invite(tenant, &bob, "employee").await;
    let resp = h
        .act(
            &h.root,
            ActionKind::ReactivateMember,
            Some(tenant),
            Some(&bob),
            json!({ "invitation": code }),
        )
        .await;
    assert!(resp.success, "{}", resp.message);

    let membership = h.memberships.find(&bob, tenant).await.unwrap().unwrap();
    assert_eq!(membership.status, MembershipStatus::Active);
    assert_eq!(membership.reactivated_by, Some(h.root.clone()));
    assert!(membership.suspended_at.is_some(), "suspension history is kept");

    let claims = h.stored_claims(&bob).await;
    assert_eq!(claims.active_tenant, ActiveTenant::Selected { tenant_id: tenant });
}

#[tokio::test]
async fn concurrent_deactivate_and_reactivate_leave_claims_matching_the_store() {
    let h = Harness::new().await;
    let tenant = h.create_tenant("acme").await;
    let bob = h.register("bob").await;
    h.join(tenant, &bob, "employee").await;
    let resp = h
        .act(&h.root, ActionKind::DeactivateMember, Some(tenant), Some(&bob), Value::Null)
        .await;
    assert!(resp.success, "{}", resp.message);
    let code = h.invite(tenant, &bob, "employee").await;

    let (reactivated, deactivated) = tokio::join!(
        h.act(
            &h.root,
            ActionKind::ReactivateMember,
            Some(tenant),
            Some(&bob),
            json!({ "invitation": code }),
        ),
        h.act(&h.root, ActionKind::DeactivateMember, Some(tenant), Some(&bob), Value::Null),
    );
    assert!(reactivated.success, "{}", reactivated.message);
    assert!(deactivated.success, "{}", deactivated.message);

    // Whichever write landed last decides the status; claims follow it.
    let membership = h.memberships.find(&bob, tenant).await.unwrap().unwrap();
    assert_ne!(membership.status, MembershipStatus::Invited);
    let expected = h.dispatcher.reconciler().derive(&bob).await.unwrap();
    assert_eq!(h.stored_claims(&bob).await, expected);
    assert_eq!(
        expected.workspace(tenant).is_some(),
        membership.status == MembershipStatus::Active
    );
    assert!(h.dispatcher.reconciler().pending_users().await.is_empty());
}

#[tokio::test]
async fn switching_to_a_suspended_workspace_is_denied() {
    let h = Harness::new().await;
    let a = h.create_tenant("alpha").await;
    let b = h.create_tenant("beta").await;
    let bob = h.register("bob").await;
    h.join(a, &bob, "employee").await;
    h.join(b, &bob, "employee").await;

    h.act(&h.root, ActionKind::DeactivateMember, Some(b), Some(&bob), Value::Null)
        .await;

    let resp = h
        .act(&bob, ActionKind::SwitchWorkspace, Some(b), None, Value::Null)
        .await;
    assert_eq!(resp.code, Some(ErrorCode::AccessDenied));
    assert_eq!(h.memberships.get_active_tenant(&bob).await.unwrap(), Some(a));
}

#[tokio::test]
async fn deleting_a_tenant_requires_no_active_members() {
    let h = Harness::new().await;
    let tenant = h.create_tenant("acme").await;
    let bob = h.register("bob").await;
    h.join(tenant, &bob, "employee").await;

    let refused = h
        .act(&h.root, ActionKind::DeleteTenant, Some(tenant), None, Value::Null)
        .await;
    assert_eq!(refused.code, Some(ErrorCode::Conflict));

    h.act(&h.root, ActionKind::DeactivateMember, Some(tenant), Some(&bob), Value::Null)
        .await;
    let deleted = h
        .act(&h.root, ActionKind::DeleteTenant, Some(tenant), None, Value::Null)
        .await;
    assert!(deleted.success, "{}", deleted.message);

    assert!(h.memberships.list_by_user(&bob).await.unwrap().is_empty());
    let claims = h.stored_claims(&bob).await;
    assert!(claims.tenant_ids.is_empty());
    assert!(h.users.find(&bob).await.unwrap().is_some(), "users outlive tenants");
}
