//! SwitchWorkspaceHandler - Command handler for changing the active tenant.

use std::sync::Arc;

use crate::application::{audit_trail, ClaimsReconciler};
use crate::domain::audit::{AuditAction, AuditRecord};
use crate::domain::claims::SessionClaims;
use crate::domain::foundation::{TenantId, Timestamp, UserId};
use crate::domain::membership::{Membership, WorkspaceError};
use crate::ports::{AuditSink, MembershipStore};

#[derive(Debug, Clone)]
pub struct SwitchWorkspaceCommand {
    pub user_id: UserId,
    pub tenant_id: TenantId,
}

#[derive(Debug, Clone)]
pub struct SwitchWorkspaceResult {
    pub membership: Membership,
    pub claims: Option<SessionClaims>,
}

pub struct SwitchWorkspaceHandler {
    memberships: Arc<dyn MembershipStore>,
    audit: Arc<dyn AuditSink>,
    reconciler: Arc<ClaimsReconciler>,
}

impl SwitchWorkspaceHandler {
    pub fn new(
        memberships: Arc<dyn MembershipStore>,
        audit: Arc<dyn AuditSink>,
        reconciler: Arc<ClaimsReconciler>,
    ) -> Self {
        Self {
            memberships,
            audit,
            reconciler,
        }
    }

    pub async fn handle(
        &self,
        cmd: SwitchWorkspaceCommand,
    ) -> Result<SwitchWorkspaceResult, WorkspaceError> {
        let membership = self
            .memberships
            .find(&cmd.user_id, cmd.tenant_id)
            .await?
            .filter(|m| m.is_active())
            .ok_or_else(|| {
                WorkspaceError::access_denied(format!(
                    "no active membership in tenant {}",
                    cmd.tenant_id
                ))
            })?;

        let previous = self.memberships.get_active_tenant(&cmd.user_id).await?;
        self.memberships
            .set_active_tenant(&cmd.user_id, Some(cmd.tenant_id))
            .await?;

        tracing::info!(user_id = %cmd.user_id, tenant_id = %cmd.tenant_id, "Workspace switched");

        let mut record =
            AuditRecord::new(AuditAction::WorkspaceSwitched, cmd.user_id.clone(), Timestamp::now())
                .tenant(cmd.tenant_id)
                .target(cmd.user_id.clone());
        if let Some(previous) = previous {
            record = record.detail("previous_tenant_id", previous);
        }
        audit_trail::emit(self.audit.as_ref(), record).await;

        let claims = self.reconciler.reconcile_after_write(&cmd.user_id).await;
        Ok(SwitchWorkspaceResult { membership, claims })
    }
}
