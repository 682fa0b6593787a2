//! ReactivateMemberHandler - Command handler for restoring a suspended membership.
//!
//! Reactivation always consumes an invitation addressed to the target in
//! this tenant. An admin cannot restore access without that artifact.
//! A failed write after consuming it releases the invitation again.

use std::sync::Arc;

use crate::application::invitation_validator::{InvitationRef, InvitationValidator};
use crate::application::{audit_trail, workspace_pointer, Authorizer, ClaimsReconciler};
use crate::domain::audit::{AuditAction, AuditRecord};
use crate::domain::foundation::{TenantId, Timestamp, UserId};
use crate::domain::invitation::Invitation;
use crate::domain::membership::{Membership, MembershipStatus, ResourceKind, WorkspaceError};
use crate::ports::{AuditSink, MembershipStore, UserDirectory};

#[derive(Debug, Clone)]
pub struct ReactivateMemberCommand {
    pub actor_id: UserId,
    pub tenant_id: TenantId,
    pub target_user_id: UserId,

    /// Code or id of a pending invitation for the target.
    pub invitation: String,
}

#[derive(Debug, Clone)]
pub struct ReactivateMemberResult {
    pub membership: Membership,

    /// The consumed invitation, `None` when the member was already active.
    pub invitation: Option<Invitation>,
}

pub struct ReactivateMemberHandler {
    memberships: Arc<dyn MembershipStore>,
    users: Arc<dyn UserDirectory>,
    audit: Arc<dyn AuditSink>,
    authorizer: Authorizer,
    validator: Arc<InvitationValidator>,
    reconciler: Arc<ClaimsReconciler>,
}

impl ReactivateMemberHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
            memberships: Arc<dyn MembershipStore>,
        users: Arc<dyn UserDirectory>,
        audit: Arc<dyn AuditSink>,
        authorizer: Authorizer,
        validator: Arc<InvitationValidator>,
        reconciler: Arc<ClaimsReconciler>,
    ) -> Self {
        Self {
            memberships,
            users,
            audit,
            authorizer,
            validator,
            reconciler,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReactivateMemberCommand,
    ) -> Result<ReactivateMemberResult, WorkspaceError> {
        // 1. Authorize and load the target
        self.authorizer
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

        match membership.status {
            MembershipStatus::Suspended => {}
            // A retried call after success consumes nothing further.
            MembershipStatus::Active => {
                return Ok(ReactivateMemberResult {
                    membership,
                    invitation: None,
                })
            }
            MembershipStatus::Invited => {
                return Err(WorkspaceError::conflict(
                    "membership has not been activated yet",
                ))
            }
        }

        let target = self
            .users
            .find(&cmd.target_user_id)
            .await?
            .ok_or_else(|| WorkspaceError::not_found(ResourceKind::User, &cmd.target_user_id))?;

        // 2. The artifact must be pending, unexpired, for this tenant, for this user
        let now = Timestamp::now();
        let reference = InvitationRef::parse(&cmd.invitation)?;
        let validated = self.validator.validate(&reference, None, now).await?;
        let pending = validated.invitation;

        if pending.tenant_id != cmd.tenant_id {
            return Err(WorkspaceError::invitation_invalid(pending.code.as_str()));
        }
        if !target.has_contact(&pending.contact) {
            return Err(WorkspaceError::ContactMismatch);
        }

        // 3. Consume it, then restore access
        let invitation = self
            .validator
            .consume(&pending, &cmd.target_user_id, now)
            .await?;

        if let Err(e) = self.restore(&mut membership, &cmd.actor_id, now).await {
            self.validator.release(&pending).await;
            return Err(e);
        }

        tracing::info!(
            user_id = %cmd.target_user_id,
            tenant_id = %cmd.tenant_id,
            actor_id = %cmd.actor_id,
            invitation_id = %invitation.id,
            "Membership reactivated"
        );
        audit_trail::emit(
            self.audit.as_ref(),
            AuditRecord::new(AuditAction::InvitationAccepted, cmd.target_user_id.clone(), now)
                .tenant(cmd.tenant_id)
                .target(cmd.target_user_id.clone())
                .detail("invitation_id", invitation.id)
                .detail("code", invitation.code.as_str()),
        )
        .await;
        audit_trail::emit(
            self.audit.as_ref(),
            AuditRecord::new(AuditAction::MembershipReactivated, cmd.actor_id.clone(), now)
                .tenant(cmd.tenant_id)
                .target(cmd.target_user_id.clone())
                .detail("invitation_id", invitation.id),
        )
        .await;

        // 4. Propagate
        self.reconciler
            .reconcile_after_write(&cmd.target_user_id)
            .await;

        Ok(ReactivateMemberResult {
            membership,
            invitation: Some(invitation),
        })
    }

    async fn restore(
        &self,
        membership: &mut Membership,
        actor_id: &UserId,
        now: Timestamp,
    ) -> Result<(), WorkspaceError> {
        membership.reactivate(actor_id.clone(), now)?;
        self.memberships.upsert(membership).await?;
        workspace_pointer::adopt_if_unset(
            self.memberships.as_ref(),
            &membership.user_id,
            membership.tenant_id,
        )
        .await?;
        Ok(())
    }
}
