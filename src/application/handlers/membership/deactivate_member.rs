//! DeactivateMemberHandler - Command handler for suspending a membership.
//!
//! Suspension keeps the membership record for audit and later reactivation.
//! If the suspended tenant was the user's active workspace, the pointer moves
//! to another active membership or is cleared.

use std::sync::Arc;

use crate::application::{audit_trail, workspace_pointer, Authorizer, ClaimsReconciler};
use crate::domain::audit::{AuditAction, AuditRecord};
use crate::domain::foundation::{TenantId, Timestamp, UserId};
use crate::domain::membership::{Membership, ResourceKind, WorkspaceError};
use crate::ports::{AuditSink, MembershipStore};

#[derive(Debug, Clone)]
pub struct DeactivateMemberCommand {
    pub actor_id: UserId,
    pub tenant_id: TenantId,
    pub target_user_id: UserId,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DeactivateMemberResult {
    pub membership: Membership,

    /// Where the target now lands, after any re-pointing.
    pub active_tenant: Option<TenantId>,

    /// False when the membership was already suspended.
    pub changed: bool,
}

pub struct DeactivateMemberHandler {
    memberships: Arc<dyn MembershipStore>,
    audit: Arc<dyn AuditSink>,
    authorizer: Authorizer,
    reconciler: Arc<ClaimsReconciler>,
}

impl DeactivateMemberHandler {
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
        cmd: DeactivateMemberCommand,
    ) -> Result<DeactivateMemberResult, WorkspaceError> {
        // 1. Nobody suspends themselves, whatever their role
        if cmd.actor_id == cmd.target_user_id {
            return Err(WorkspaceError::permission_denied(
                "cannot deactivate your own membership",
            ));
        }

        // 2. Actor must manage the tenant and outrank the target's role
        let actor = self
            .authorizer
            .require_tenant_admin(&cmd.actor_id, cmd.tenant_id)
            .await?;

        let mut membership = self
            .memberships
            .find(&cmd.target_user_id, cmd.tenant_id)
            .await?
            .ok_or_else(|| {
                WorkspaceError::not_found(
                    ResourceKind::Membership,
                    format!("{}@{}", cmd.target_user_id, cmd.tenant_id),
                )
            })?;

        if !actor.can_grant(membership.role) {
            return Err(WorkspaceError::permission_denied(format!(
                "cannot deactivate a member with role {}",
                membership.role
            )));
        }

        // 3. Suspend; repeating on a suspended membership changes nothing
        let changed = !membership.is_suspended();
        let now = Timestamp::now();
        if changed {
            membership.suspend(cmd.actor_id.clone(), cmd.reason.clone(), now)?;
            self.memberships.upsert(&membership).await?;
        }

        // 4. Heal the active pointer even on a repeat, in case a prior run stopped here
        let active_tenant =
            workspace_pointer::heal(self.memberships.as_ref(), &cmd.target_user_id).await?;

        if changed {
            tracing::info!(
                user_id = %cmd.target_user_id,
                tenant_id = %cmd.tenant_id,
                actor_id = %cmd.actor_id,
                "Membership suspended"
            );
            let mut record =
                AuditRecord::new(AuditAction::MembershipSuspended, cmd.actor_id.clone(), now)
                    .tenant(cmd.tenant_id)
                    .target(cmd.target_user_id.clone());
            if let Some(reason) = &cmd.reason {
                record = record.detail("reason", reason);
            }
            audit_trail::emit(self.audit.as_ref(), record).await;
        }

        // 5. Propagate
        self.reconciler
            .reconcile_after_write(&cmd.target_user_id)
            .await;

        Ok(DeactivateMemberResult {
            membership,
            active_tenant,
            changed,
        })
    }
}
