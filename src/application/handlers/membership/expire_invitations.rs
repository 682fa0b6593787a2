//! ExpireInvitationsHandler - Background sweep that marks overdue invitations.
//!
//! Complements the lazy expiry done on validation so stale invitations do
//! not linger as `pending` when nobody presents them.

use std::sync::Arc;

use crate::application::audit_trail;
use crate::domain::audit::{AuditAction, AuditRecord};
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::invitation::InvitationStatus;
use crate::domain::membership::WorkspaceError;
use crate::ports::{AuditSink, InvitationStore};

#[derive(Debug, Clone)]
pub struct ExpireInvitationsCommand {
    pub now: Timestamp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpireInvitationsResult {
    pub expired: usize,

    /// Overdue invitations another writer moved on first.
    pub skipped: usize,
}

pub struct ExpireInvitationsHandler {
    invitations: Arc<dyn InvitationStore>,
    audit: Arc<dyn AuditSink>,
}

impl ExpireInvitationsHandler {
    pub fn new(invitations: Arc<dyn InvitationStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { invitations, audit }
    }

    pub async fn handle(
        &self,
        cmd: ExpireInvitationsCommand,
    ) -> Result<ExpireInvitationsResult, WorkspaceError> {
        let mut result = ExpireInvitationsResult::default();

        for mut invitation in self.invitations.list_overdue(cmd.now).await? {
            invitation.expire(cmd.now)?;
            let won = self
                .invitations
                .update_if_status(&invitation, InvitationStatus::Pending)
                .await?;
            if !won {
                result.skipped += 1;
                continue;
            }

            result.expired += 1;
            audit_trail::emit(
                self.audit.as_ref(),
                AuditRecord::new(AuditAction::InvitationExpired, UserId::system(), cmd.now)
                    .tenant(invitation.tenant_id)
                    .detail("invitation_id", invitation.id)
                    .detail("code", invitation.code.as_str()),
            )
            .await;
        }

        if result.expired > 0 || result.skipped > 0 {
            tracing::info!(
                expired = result.expired,
                skipped = result.skipped,
                "Invitation expiry sweep finished"
            );
        }
        Ok(result)
    }
}
