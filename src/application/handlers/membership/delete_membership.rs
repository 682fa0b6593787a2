//! DeleteMembershipHandler - Command handler for permanently removing a membership.

use std::sync::Arc;

use crate::application::{audit_trail, workspace_pointer, Authorizer, ClaimsReconciler};
use crate::domain::audit::{AuditAction, AuditRecord};
use crate::domain::foundation::{TenantId, Timestamp, UserId};
use crate::domain::membership::{ResourceKind, WorkspaceError};
use crate::ports::{AuditSink, MembershipStore};

#[derive(Debug, Clone)]
pub struct DeleteMembershipCommand {
    pub actor_id: UserId,
    pub tenant_id: TenantId,
    pub target_user_id: UserId,
}

#[derive(Debug, Clone)]
pub struct DeleteMembershipResult {
    pub active_tenant: Option<TenantId>,
}

/// Hard delete. Super admins only; suspension is the normal path.
pub struct DeleteMembershipHandler {
    memberships: Arc<dyn MembershipStore>,
    audit: Arc<dyn AuditSink>,
    authorizer: Authorizer,
    reconciler: Arc<ClaimsReconciler>,
}

impl DeleteMembershipHandler {
    pub fn new(
        memberships: Arc<dyn MembershipStore>,
        audit: Arc<dyn AuditSink>,
        authorizer: Authorizer,
        reconciler: Arc<ClaimsReconciler>,
    ) -> Self {
        Self {
            memberships,
            audit,
            authorizer,
            reconciler,
        }
    }

    pub async fn handle(
        &self,
        cmd: DeleteMembershipCommand,
    ) -> Result<DeleteMembershipResult, WorkspaceError> {
        if cmd.actor_id == cmd.target_user_id {
            return Err(WorkspaceError::permission_denied(
                "cannot delete your own membership",
            ));
        }
        self.authorizer.require_super_admin(&cmd.actor_id).await?;

        let existing = self
            .memberships
            .find(&cmd.target_user_id, cmd.tenant_id)
            .await?
            .ok_or_else(|| {
                WorkspaceError::not_found(
                    ResourceKind::Membership,
                    format!("{}@{}", cmd.target_user_id, cmd.tenant_id),
                )
            })?;

        // A concurrent delete may win between the read and here; treat it as done.
        self.memberships
            .delete(&cmd.target_user_id, cmd.tenant_id)
            .await?;
        let active_tenant =
            workspace_pointer::heal(self.memberships.as_ref(), &cmd.target_user_id).await?;

        let now = Timestamp::now();
        tracing::info!(
            user_id = %cmd.target_user_id,
            tenant_id = %cmd.tenant_id,
            actor_id = %cmd.actor_id,
            "Membership deleted"
        );
        audit_trail::emit(
            self.audit.as_ref(),
            AuditRecord::new(AuditAction::MembershipDeleted, cmd.actor_id.clone(), now)
                .tenant(cmd.tenant_id)
                .target(cmd.target_user_id.clone())
                .detail("role", existing.role)
                .detail("status", existing.status),
        )
        .await;

        self.reconciler
            .reconcile_after_write(&cmd.target_user_id)
            .await;

        Ok(DeleteMembershipResult { active_tenant })
    }
}
