//! Invitation lookup and validation.
//!
//! Resolves a presented code or id, loads what evaluation needs, and runs
//! the pure [`evaluate`] check. An overdue pending invitation is persisted
//! as `expired` here, so a lazy expiry is visible to every later caller.

use std::sync::Arc;

use crate::application::audit_trail;
use crate::domain::audit::{AuditAction, AuditRecord};
use crate::domain::foundation::{Contact, InvitationId, Timestamp, UserId};
use crate::domain::invitation::{
    evaluate, EvaluationInput, Invitation, InvitationCode, InvitationDecision, InvitationRejection,
    InvitationStatus,
};
use crate::domain::membership::{ResourceKind, WorkspaceError};
use crate::ports::{AuditSink, InvitationStore, MembershipStore, UserDirectory};

/// How the caller identified the invitation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvitationRef {
    Code(InvitationCode),
    Id(InvitationId),
}

impl InvitationRef {
    /// Parses user input: a UUID is an invitation id, anything else a code.
    pub fn parse(input: &str) -> Result<Self, WorkspaceError> {
        let trimmed = input.trim();
        if let Ok(id) = trimmed.parse::<InvitationId>() {
            return Ok(InvitationRef::Id(id));
        }
        InvitationCode::parse(trimmed)
            .map(InvitationRef::Code)
            .map_err(|_| WorkspaceError::invitation_invalid(trimmed))
    }

    fn label(&self) -> String {
        match self {
            InvitationRef::Code(code) => code.to_string(),
            InvitationRef::Id(id) => id.to_string(),
        }
    }
}

/// A usable invitation and the lifecycle path it leads to.
#[derive(Debug, Clone)]
pub struct ValidatedInvitation {
    pub invitation: Invitation,
    pub decision: InvitationDecision,
}

pub struct InvitationValidator {
    invitations: Arc<dyn InvitationStore>,
    memberships: Arc<dyn MembershipStore>,
    users: Arc<dyn UserDirectory>,
    audit: Arc<dyn AuditSink>,
}

impl InvitationValidator {
    pub fn new(
        invitations: Arc<dyn InvitationStore>,
        memberships: Arc<dyn MembershipStore>,
        users: Arc<dyn UserDirectory>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            invitations,
            memberships,
            users,
            audit,
        }
    }

    /// Validates an invitation for use at `now`.
    ///
    /// # Errors
    ///
    /// - `InvitationInvalid` if unknown, accepted or cancelled
    /// - `InvitationExpired` if expired or past expiry (the expiry is persisted first)
    /// - `ContactMismatch` if `presented_contact` differs from the invitation's
    pub async fn validate(
        &self,
        reference: &InvitationRef,
        presented_contact: Option<&Contact>,
        now: Timestamp,
    ) -> Result<ValidatedInvitation, WorkspaceError> {
        let invitation = self
            .lookup(reference)
            .await?
            .ok_or_else(|| WorkspaceError::invitation_invalid(reference.label()))?;

        // Membership of whoever the invitation's contact belongs to.
        let target_membership = match self.users.find_by_contact(&invitation.contact).await? {
            Some(user) => self.memberships.find(&user.id, invitation.tenant_id).await?,
            None => None,
        };

        let outcome = evaluate(EvaluationInput {
            invitation: &invitation,
            now,
            presented_contact,
            target_membership: target_membership.as_ref(),
        });

        match outcome {
            Ok(decision) => Ok(ValidatedInvitation {
                invitation,
                decision,
            }),
            Err(InvitationRejection::Overdue) => {
                self.persist_expiry(invitation.clone(), now).await?;
                Err(InvitationRejection::Overdue.into_error(invitation.code.as_str()))
            }
            Err(rejection) => {
                tracing::debug!(
                    code = %invitation.code,
                    rejection = ?rejection,
                    "Invitation rejected"
                );
                Err(rejection.into_error(invitation.code.as_str()))
            }
        }
    }

    /// Marks a validated invitation accepted by `user_id`.
    ///
    /// The write is a compare-and-set from `pending`; losing it to a
    /// concurrent accept, expiry or cancel fails with `InvitationInvalid`.
    pub async fn consume(
        &self,
        pending: &Invitation,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Invitation, WorkspaceError> {
        let mut invitation = pending.clone();
        invitation.accept(user_id.clone(), now)?;
        if !self
            .invitations
            .update_if_status(&invitation, InvitationStatus::Pending)
            .await?
        {
            return Err(WorkspaceError::invitation_invalid(invitation.code.as_str()));
        }
        Ok(invitation)
    }

    /// Puts a consumed invitation back to `pending` after the grant it paid
    /// for failed, so the same code can be presented again.
    ///
    /// Only an `accepted` row is overwritten. A failed release is logged;
    /// the code then stays used up.
    pub async fn release(&self, pending: &Invitation) {
        match self
            .invitations
            .update_if_status(pending, InvitationStatus::Accepted)
            .await
        {
            Ok(true) => tracing::info!(code = %pending.code, "Invitation released after failed grant"),
            Ok(false) => tracing::warn!(code = %pending.code, "Invitation changed before release"),
            Err(e) => tracing::error!(
                code = %pending.code,
                error = %e,
                "Could not release invitation after failed grant"
            ),
        }
    }

    /// Fetches by id, failing with `NotFound` rather than `InvitationInvalid`.
    pub async fn get(&self, id: InvitationId) -> Result<Invitation, WorkspaceError> {
        self.invitations
            .find_by_id(id)
            .await?
            .ok_or_else(|| WorkspaceError::not_found(ResourceKind::Invitation, id))
    }

    async fn lookup(&self, reference: &InvitationRef) -> Result<Option<Invitation>, WorkspaceError> {
        let found = match reference {
            InvitationRef::Code(code) => self.invitations.find_by_code(code).await?,
            InvitationRef::Id(id) => self.invitations.find_by_id(*id).await?,
        };
        Ok(found)
    }

    async fn persist_expiry(&self, mut invitation: Invitation, now: Timestamp) -> Result<(), WorkspaceError> {
        invitation.expire(now)?;
        // A concurrent accept or sweep may already have moved it on.
        if self
            .invitations
            .update_if_status(&invitation, InvitationStatus::Pending)
            .await?
        {
            tracing::info!(code = %invitation.code, tenant_id = %invitation.tenant_id, "Invitation expired on use");
            audit_trail::emit(
                self.audit.as_ref(),
                AuditRecord::new(AuditAction::InvitationExpired, UserId::system(), now)
                    .tenant(invitation.tenant_id)
                    .detail("invitation_id", invitation.id)
                    .detail("code", invitation.code.as_str()),
            )
            .await;
        }
        Ok(())
    }
}
