//! InviteMemberHandler - Command handler for inviting a contact into a tenant.
//!
//! Issues a pending invitation with a fresh code. When the contact already
//! belongs to a registered user without a membership here, the user is
//! pre-provisioned as `invited` so the workspace shows up in their claims.

use std::sync::Arc;

use crate::application::{audit_trail, Authorizer, ClaimsReconciler};
use crate::domain::audit::{AuditAction, AuditRecord};
use crate::domain::foundation::{Contact, ErrorCode, InvitationId, TenantId, Timestamp, UserId};
use crate::domain::invitation::{Invitation, InvitationCode};
use crate::domain::membership::{
    Membership, MembershipStatus, ResourceKind, Role, WorkspaceError,
};
use crate::ports::{AuditSink, InvitationStore, MembershipStore, TenantStore, UserDirectory};

/// Invitation issuing settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationPolicy {
    pub expiry_days: i64,

    /// Codes drawn before giving up on finding an unused one.
    pub max_code_attempts: u32,
}

impl Default for InvitationPolicy {
    fn default() -> Self {
        Self {
            expiry_days: 7,
            max_code_attempts: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InviteMemberCommand {
    pub actor_id: UserId,
    pub tenant_id: TenantId,
    pub contact: Contact,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct InviteMemberResult {
    pub invitation: Invitation,

    /// Set when a registered user was pre-provisioned.
    pub provisioned: Option<Membership>,
}

pub struct InviteMemberHandler {
    tenants: Arc<dyn TenantStore>,
    invitations: Arc<dyn InvitationStore>,
    memberships: Arc<dyn MembershipStore>,
    users: Arc<dyn UserDirectory>,
    audit: Arc<dyn AuditSink>,
    authorizer: Authorizer,
    reconciler: Arc<ClaimsReconciler>,
    policy: InvitationPolicy,
}

impl InviteMemberHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenants: Arc<dyn TenantStore>,
        invitations: Arc<dyn InvitationStore>,
        memberships: Arc<dyn MembershipStore>,
        users: Arc<dyn UserDirectory>,
        audit: Arc<dyn AuditSink>,
        authorizer: Authorizer,
        reconciler: Arc<ClaimsReconciler>,
        policy: InvitationPolicy,
    ) -> Self {
        Self {
            tenants,
            invitations,
            memberships,
            users,
            audit,
            authorizer,
            reconciler,
            policy,
        }
    }

    pub async fn handle(
        &self,
        cmd: InviteMemberCommand,
    ) -> Result<InviteMemberResult, WorkspaceError> {
        // 1. Tenant must exist and the actor must manage it
        let tenant = self
            .tenants
            .find(cmd.tenant_id)
            .await?
            .ok_or_else(|| WorkspaceError::not_found(ResourceKind::Tenant, cmd.tenant_id))?;
        let actor = self
            .authorizer
            .require_tenant_admin(&cmd.actor_id, tenant.id)
            .await?;

        if !actor.can_grant(cmd.role) {
            return Err(WorkspaceError::permission_denied(format!(
                "cannot grant role {}",
                cmd.role
            )));
        }

        // 2. An active member needs no invitation
        let existing_user = self.users.find_by_contact(&cmd.contact).await?;
        let existing_membership = match &existing_user {
            Some(user) => self.memberships.find(&user.id, tenant.id).await?,
            None => None,
        };
        if existing_membership.as_ref().is_some_and(|m| m.is_active()) {
            return Err(WorkspaceError::conflict(format!(
                "{} is already an active member of {}",
                cmd.contact, tenant.auth_namespace
            )));
        }

        // 3. Issue the invitation under a code no pending invitation holds
        let now = Timestamp::now();
        let invitation = self.issue(&cmd, now).await?;

        tracing::info!(
            invitation_id = %invitation.id,
            tenant_id = %tenant.id,
            role = %invitation.role,
            actor_id = %cmd.actor_id,
            "Invitation created"
        );
        audit_trail::emit(
            self.audit.as_ref(),
            AuditRecord::new(AuditAction::InvitationCreated, cmd.actor_id.clone(), now)
                .tenant(tenant.id)
                .detail("invitation_id", invitation.id)
                .detail("role", invitation.role)
                .detail("contact", &invitation.contact),
        )
        .await;

        // 4. Pre-provision a known user who has no membership yet. Suspended
        //    and invited memberships are left as they are.
        let provisioned = match (existing_user, existing_membership) {
            (Some(user), None) => {
                let membership = Membership::invited(
                    user.id.clone(),
                    tenant.id,
                    cmd.role,
                    cmd.actor_id.clone(),
                    now,
                );
                self.memberships.upsert(&membership).await?;
                audit_trail::emit(
                    self.audit.as_ref(),
                    AuditRecord::new(AuditAction::MembershipInvited, cmd.actor_id.clone(), now)
                        .tenant(tenant.id)
                        .target(user.id.clone())
                        .detail("invitation_id", invitation.id),
                )
                .await;
                self.reconciler.reconcile_after_write(&user.id).await;
                Some(membership)
            }
            (_, Some(m)) if m.status == MembershipStatus::Suspended => {
                tracing::debug!(
                    user_id = %m.user_id,
                    tenant_id = %tenant.id,
                    "Invitation issued as reactivation artifact"
                );
                None
            }
            _ => None,
        };

        Ok(InviteMemberResult {
            invitation,
            provisioned,
        })
    }

    async fn issue(
        &self,
        cmd: &InviteMemberCommand,
        now: Timestamp,
    ) -> Result<Invitation, WorkspaceError> {
        for attempt in 1..=self.policy.max_code_attempts {
            let code = InvitationCode::generate(&mut rand::thread_rng());
            if self.invitations.code_in_use(&code).await? {
                tracing::debug!(attempt, "Invitation code collision");
                continue;
            }

            let invitation = Invitation::issue(
                InvitationId::new(),
                code,
                cmd.tenant_id,
                cmd.contact.clone(),
                cmd.role,
                cmd.actor_id.clone(),
                now,
                self.policy.expiry_days,
            );

            // The store re-checks under its own lock; a racing insert loses here.
            match self.invitations.insert(&invitation).await {
                Ok(()) => return Ok(invitation),
                Err(e) if e.code == ErrorCode::Conflict => {
                    tracing::debug!(attempt, "Invitation code taken concurrently");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(
            attempts = self.policy.max_code_attempts,
            "Could not allocate an unused invitation code"
        );
        Err(WorkspaceError::conflict(
            "could not allocate an unused invitation code",
        ))
    }
}
