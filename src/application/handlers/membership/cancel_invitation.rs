//! CancelInvitationHandler - Command handler for withdrawing a pending invitation.
//!
//! A pre-provisioned `invited` membership that no other pending invitation
//! backs is removed along with it.

use std::sync::Arc;

use crate::application::{audit_trail, Authorizer, ClaimsReconciler};
use crate::domain::audit::{AuditAction, AuditRecord};
use crate::domain::foundation::{InvitationId, Timestamp, UserId};
use crate::domain::invitation::{Invitation, InvitationStatus};
use crate::domain::membership::{MembershipStatus, ResourceKind, WorkspaceError};
use crate::ports::{AuditSink, InvitationStore, MembershipStore, UserDirectory};

#[derive(Debug, Clone)]
pub struct CancelInvitationCommand {
    pub actor_id: UserId,
    pub invitation_id: InvitationId,
}

#[derive(Debug, Clone)]
pub struct CancelInvitationResult {
    pub invitation: Invitation,

    /// User whose pre-provisioned membership was withdrawn.
    pub withdrawn_for: Option<UserId>,
}

pub struct CancelInvitationHandler {
    invitations: Arc<dyn InvitationStore>,
    memberships: Arc<dyn MembershipStore>,
    users: Arc<dyn UserDirectory>,
    audit: Arc<dyn AuditSink>,
    authorizer: Authorizer,
    reconciler: Arc<ClaimsReconciler>,
}

impl CancelInvitationHandler {
    pub fn new(
        invitations: Arc<dyn InvitationStore>,
        memberships: Arc<dyn MembershipStore>,
        users: Arc<dyn UserDirectory>,
        audit: Arc<dyn AuditSink>,
        authorizer: Authorizer,
        reconciler: Arc<ClaimsReconciler>,
    ) -> Self {
        Self {
            invitations,
            memberships,
            users,
            audit,
            authorizer,
            reconciler,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelInvitationCommand,
    ) -> Result<CancelInvitationResult, WorkspaceError> {
        let mut invitation = self
            .invitations
            .find_by_id(cmd.invitation_id)
            .await?
            .ok_or_else(|| WorkspaceError::not_found(ResourceKind::Invitation, cmd.invitation_id))?;

        self.authorizer
            .require_tenant_admin(&cmd.actor_id, invitation.tenant_id)
            .await?;

        if !invitation.is_pending() {
            return Err(WorkspaceError::invitation_invalid(invitation.code.as_str()));
        }

        let now = Timestamp::now();
        invitation.cancel(now)?;
        if !self
            .invitations
            .update_if_status(&invitation, InvitationStatus::Pending)
            .await?
        {
            return Err(WorkspaceError::invitation_invalid(invitation.code.as_str()));
        }

        tracing::info!(
            invitation_id = %invitation.id,
            tenant_id = %invitation.tenant_id,
            actor_id = %cmd.actor_id,
            "Invitation cancelled"
        );
        audit_trail::emit(
            self.audit.as_ref(),
            AuditRecord::new(AuditAction::InvitationCancelled, cmd.actor_id.clone(), now)
                .tenant(invitation.tenant_id)
                .detail("invitation_id", invitation.id)
                .detail("code", invitation.code.as_str()),
        )
        .await;

        let withdrawn_for = self.withdraw_pre_provisioned(&invitation, &cmd.actor_id, now).await?;

        Ok(CancelInvitationResult {
            invitation,
            withdrawn_for,
        })
    }

    async fn withdraw_pre_provisioned(
        &self,
        invitation: &Invitation,
        actor_id: &UserId,
        now: Timestamp,
    ) -> Result<Option<UserId>, WorkspaceError> {
        let Some(user) = self.users.find_by_contact(&invitation.contact).await? else {
            return Ok(None);
        };
        let invited = self
            .memberships
            .find(&user.id, invitation.tenant_id)
            .await?
            .is_some_and(|m| m.status == MembershipStatus::Invited);
        if !invited {
            return Ok(None);
        }

        let still_backed = self
            .invitations
            .list_by_tenant(invitation.tenant_id)
            .await?
            .iter()
            .any(|other| other.is_pending() && user.has_contact(&other.contact));
        if still_backed {
            return Ok(None);
        }

        self.memberships.delete(&user.id, invitation.tenant_id).await?;
        audit_trail::emit(
            self.audit.as_ref(),
            AuditRecord::new(AuditAction::MembershipDeleted, actor_id.clone(), now)
                .tenant(invitation.tenant_id)
                .target(user.id.clone())
                .detail("invitation_id", invitation.id),
        )
        .await;
        self.reconciler.reconcile_after_write(&user.id).await;

        Ok(Some(user.id))
    }
}
