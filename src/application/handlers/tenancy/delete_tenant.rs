//! DeleteTenantHandler - Command handler for removing a tenant.
//!
//! Refused while anyone is still active in the tenant. Invited and suspended
//! memberships, and all invitations, are removed with it; every affected
//! user is reconciled afterwards.

use std::sync::Arc;

use crate::application::{audit_trail, workspace_pointer, Authorizer, ClaimsReconciler};
use crate::domain::audit::{AuditAction, AuditRecord};
use crate::domain::foundation::{TenantId, Timestamp, UserId};
use crate::domain::membership::{ResourceKind, WorkspaceError};
use crate::ports::{AuditSink, InvitationStore, MembershipStore, TenantStore};

#[derive(Debug, Clone)]
pub struct DeleteTenantCommand {
    pub actor_id: UserId,
    pub tenant_id: TenantId,
}

#[derive(Debug, Clone)]
pub struct DeleteTenantResult {
    pub removed_memberships: usize,
    pub removed_invitations: u64,
}

pub struct DeleteTenantHandler {
    tenants: Arc<dyn TenantStore>,
    memberships: Arc<dyn MembershipStore>,
    invitations: Arc<dyn InvitationStore>,
    audit: Arc<dyn AuditSink>,
    authorizer: Authorizer,
    reconciler: Arc<ClaimsReconciler>,
}

impl DeleteTenantHandler {
    pub fn new(
        tenants: Arc<dyn TenantStore>,
        memberships: Arc<dyn MembershipStore>,
        invitations: Arc<dyn InvitationStore>,
        audit: Arc<dyn AuditSink>,
        authorizer: Authorizer,
        reconciler: Arc<ClaimsReconciler>,
    ) -> Self {
        Self {
            tenants,
            memberships,
            invitations,
            audit,
            authorizer,
            reconciler,
        }
    }

    pub async fn handle(
        &self,
        cmd: DeleteTenantCommand,
    ) -> Result<DeleteTenantResult, WorkspaceError> {
        self.authorizer.require_platform_admin(&cmd.actor_id).await?;

        let tenant = self
            .tenants
            .find(cmd.tenant_id)
            .await?
            .ok_or_else(|| WorkspaceError::not_found(ResourceKind::Tenant, cmd.tenant_id))?;

        let active = self
            .memberships
            .list_by_tenant(tenant.id)
            .await?
            .into_iter()
            .filter(|m| m.is_active())
            .count();
        if active > 0 {
            return Err(WorkspaceError::conflict(format!(
                "tenant {} still has {} active member(s)",
                tenant.auth_namespace, active
            )));
        }

        let removed_invitations = self.invitations.delete_by_tenant(tenant.id).await?;
        let affected = self.memberships.delete_by_tenant(tenant.id).await?;
        self.tenants.delete(tenant.id).await?;

        let now = Timestamp::now();
        tracing::info!(
            tenant_id = %tenant.id,
            auth_namespace = %tenant.auth_namespace,
            memberships = affected.len(),
            invitations = removed_invitations,
            "Tenant deleted"
        );
        audit_trail::emit(
            self.audit.as_ref(),
            AuditRecord::new(AuditAction::TenantDeleted, cmd.actor_id.clone(), now)
                .tenant(tenant.id)
                .detail("auth_namespace", &tenant.auth_namespace)
                .detail("removed_memberships", affected.len())
                .detail("removed_invitations", removed_invitations),
        )
        .await;

        for user_id in &affected {
            if let Err(e) = workspace_pointer::heal(self.memberships.as_ref(), user_id).await {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to heal active workspace");
            }
            self.reconciler.reconcile_after_write(user_id).await;
        }

        Ok(DeleteTenantResult {
            removed_memberships: affected.len(),
            removed_invitations,
        })
    }
}
