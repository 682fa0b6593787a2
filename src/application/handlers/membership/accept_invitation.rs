//! AcceptInvitationHandler - Command handler for redeeming an invitation.
//!
//! The invitation is consumed with a compare-and-set before the membership
//! is written, so two concurrent accepts of one code grant access once.
//! If the grant then fails the invitation is released back to `pending`,
//! so retrying the same call is safe.

use std::sync::Arc;

use crate::application::invitation_validator::{InvitationRef, InvitationValidator};
use crate::application::{audit_trail, workspace_pointer, ClaimsReconciler};
use crate::domain::audit::{AuditAction, AuditRecord};
use crate::domain::claims::SessionClaims;
use crate::domain::foundation::{Contact, Timestamp, UserId};
use crate::domain::invitation::{Invitation, InvitationDecision};
use crate::domain::membership::{Membership, MembershipStatus, ResourceKind, WorkspaceError};
use crate::ports::{AuditSink, MembershipStore, UserDirectory};

#[derive(Debug, Clone)]
pub struct AcceptInvitationCommand {
    pub user_id: UserId,

    /// Invitation code or invitation id.
    pub reference: String,

    /// Contact the user typed in alongside the code, if any.
    pub contact: Option<Contact>,
}

#[derive(Debug, Clone)]
pub struct AcceptInvitationResult {
    pub membership: Membership,
    pub invitation: Invitation,
    pub decision: InvitationDecision,

    /// Claims written for the user, `None` if reconciliation is pending.
    pub claims: Option<SessionClaims>,
}

pub struct AcceptInvitationHandler {
    memberships: Arc<dyn MembershipStore>,
    users: Arc<dyn UserDirectory>,
    audit: Arc<dyn AuditSink>,
    validator: Arc<InvitationValidator>,
    reconciler: Arc<ClaimsReconciler>,
}

impl AcceptInvitationHandler {
    pub fn new(
            memberships: Arc<dyn MembershipStore>,
        users: Arc<dyn UserDirectory>,
        audit: Arc<dyn AuditSink>,
        validator: Arc<InvitationValidator>,
        reconciler: Arc<ClaimsReconciler>,
    ) -> Self {
        Self {
            memberships,
            users,
            audit,
            validator,
            reconciler,
        }
    }

    pub async fn handle(
        &self,
        cmd: AcceptInvitationCommand,
    ) -> Result<AcceptInvitationResult, WorkspaceError> {
        let now = Timestamp::now();

        // 1. The accepting user must be registered
        self.users
            .find(&cmd.user_id)
            .await?
            .ok_or_else(|| WorkspaceError::not_found(ResourceKind::User, &cmd.user_id))?;

        // 2. Validate (lazy expiry is persisted inside)
        let reference = InvitationRef::parse(&cmd.reference)?;
        let validated = self
            .validator
            .validate(&reference, cmd.contact.as_ref(), now)
            .await?;
        let decision = validated.decision;

        // A reactivation invitation belongs to the suspended user it names.
        if let InvitationDecision::Reactivation { user_id } = &decision {
            if *user_id != cmd.user_id {
                return Err(WorkspaceError::ContactMismatch);
            }
        }

        // 3. Decide the membership change before anything is written
        let existing = self
            .memberships
            .find(&cmd.user_id, validated.invitation.tenant_id)
            .await?;
        let (membership, action) =
            plan_grant(existing, &cmd.user_id, &validated.invitation, &decision, now)?;

        // 4. Consume the invitation; losing the race means someone else used it
        let invitation = self
            .validator
            .consume(&validated.invitation, &cmd.user_id, now)
            .await?;

        // 5. Grant access, releasing the invitation if that fails
        if let Err(e) = self.grant(&cmd.user_id, &membership, action.is_some()).await {
            self.validator.release(&validated.invitation).await;
            return Err(e);
        }

        tracing::info!(
            user_id = %cmd.user_id,
            tenant_id = %invitation.tenant_id,
            decision = ?decision,
            "Invitation accepted"
        );
        audit_trail::emit(
            self.audit.as_ref(),
            AuditRecord::new(AuditAction::InvitationAccepted, cmd.user_id.clone(), now)
                .tenant(invitation.tenant_id)
                .target(cmd.user_id.clone())
                .detail("invitation_id", invitation.id)
                .detail("code", invitation.code.as_str()),
        )
        .await;
        if let Some(action) = action {
            audit_trail::emit(
                self.audit.as_ref(),
                AuditRecord::new(action, invitation.invited_by.clone(), now)
                    .tenant(invitation.tenant_id)
                    .target(cmd.user_id.clone())
                    .detail("role", membership.role)
                    .detail("invitation_id", invitation.id),
            )
            .await;
        }

        // 6. Propagate to claims
        let claims = self.reconciler.reconcile_after_write(&cmd.user_id).await;

        Ok(AcceptInvitationResult {
            membership,
            invitation,
            decision,
            claims,
        })
    }

    /// Writes the membership and fills an unset active-workspace preference.
    async fn grant(
        &self,
        user_id: &UserId,
        membership: &Membership,
        changed: bool,
    ) -> Result<(), WorkspaceError> {
        if changed {
            self.memberships.upsert(membership).await?;
        }
        workspace_pointer::adopt_if_unset(self.memberships.as_ref(), user_id, membership.tenant_id)
            .await?;
        Ok(())
    }
}

/// The membership an accepted invitation leads to, and the audit action for
/// the transition (`None` when the user is already active).
///
/// A suspended membership is only restored by a reactivation invitation
/// addressed to that same user.
fn plan_grant(
    existing: Option<Membership>,
    user_id: &UserId,
    invitation: &Invitation,
    decision: &InvitationDecision,
    now: Timestamp,
) -> Result<(Membership, Option<AuditAction>), WorkspaceError> {
    let Some(mut m) = existing else {
        let joined = Membership::active(
            user_id.clone(),
            invitation.tenant_id,
            invitation.role,
            Some(invitation.invited_by.clone()),
            now,
        );
        return Ok((joined, Some(AuditAction::MembershipActivated)));
    };

    match m.status {
        MembershipStatus::Invited => {
            m.activate(invitation.role, now)?;
            Ok((m, Some(AuditAction::MembershipActivated)))
        }
        MembershipStatus::Suspended => {
            let addressed_to_caller = matches!(
                decision,
                InvitationDecision::Reactivation { user_id: target } if target == user_id
            );
            if !addressed_to_caller {
                return Err(WorkspaceError::ContactMismatch);
            }
            m.reactivate(invitation.invited_by.clone(), now)?;
            Ok((m, Some(AuditAction::MembershipReactivated)))
        }
        MembershipStatus::Active => Ok((m, None)),
    }
}
