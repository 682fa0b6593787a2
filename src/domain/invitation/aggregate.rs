//! Invitation aggregate.
//!
//! A time-bounded, single-use grant authorizing a contact to join a tenant
//! with a given role.
//!
//! # Invariants
//!
//! - Only a `Pending` invitation can be accepted, expired, or cancelled
//! - `expires_at` is fixed at issue time
//! - Once accepted, `accepted_by` and `accepted_at` are set

use crate::domain::foundation::{
    Contact, DomainError, ErrorCode, InvitationId, StateMachine, TenantId, Timestamp, UserId,
};
use crate::domain::membership::Role;
use serde::{Deserialize, Serialize};

use super::{InvitationCode, InvitationStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    pub code: InvitationCode,
    pub tenant_id: TenantId,
    pub contact: Contact,
    pub role: Role,
    pub status: InvitationStatus,
    pub invited_by: UserId,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub accepted_by: Option<UserId>,
    pub accepted_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl Invitation {
    /// Issues a pending invitation valid for `ttl_days`.
    #[allow(clippy::too_many_arguments)]
    pub fn issue(
        id: InvitationId,
        code: InvitationCode,
        tenant_id: TenantId,
        contact: Contact,
        role: Role,
        invited_by: UserId,
        now: Timestamp,
        ttl_days: i64,
    ) -> Self {
        Self {
            id,
            code,
            tenant_id,
            contact,
            role,
            status: InvitationStatus::Pending,
            invited_by,
            created_at: now,
            expires_at: now.add_days(ttl_days),
            accepted_by: None,
            accepted_at: None,
            updated_at: now,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }

    /// True once `now` is strictly past the expiry instant.
    pub fn is_overdue(&self, now: Timestamp) -> bool {
        now.is_after(&self.expires_at)
    }

    /// Consumes the invitation.
    ///
    /// # Errors
    ///
    /// Returns error unless the invitation is pending.
    pub fn accept(&mut self, user_id: UserId, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(InvitationStatus::Accepted)?;
        self.accepted_by = Some(user_id);
        self.accepted_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Marks a pending invitation as expired.
    ///
    /// # Errors
    ///
    /// Returns error unless the invitation is pending.
    pub fn expire(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(InvitationStatus::Expired)?;
        self.updated_at = now;
        Ok(())
    }

    /// Withdraws a pending invitation.
    ///
    /// # Errors
    ///
    /// Returns error unless the invitation is pending.
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), DomainError> {
        self.transition_to(InvitationStatus::Cancelled)?;
        self.updated_at = now;
        Ok(())
    }

    fn transition_to(&mut self, target: InvitationStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition invitation {} from {} to {}",
                    self.code, self.status, target
                ),
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000)
    }

    fn pending() -> Invitation {
        Invitation::issue(
            InvitationId::new(),
            InvitationCode::parse("ABC123DE").unwrap(),
            TenantId::new(),
            Contact::email("new.hire@example.com").unwrap(),
            Role::Employee,
            UserId::new("admin").unwrap(),
            t0(),
            7,
        )
    }

    #[test]
    fn issue_sets_expiry_from_ttl() {
        let inv = pending();
        assert!(inv.is_pending());
        assert_eq!(inv.expires_at, t0().add_days(7));
    }

    #[test]
    fn overdue_only_strictly_after_expiry() {
        let inv = pending();
        assert!(!inv.is_overdue(inv.expires_at));
        assert!(inv.is_overdue(inv.expires_at.plus_secs(1)));
    }

    #[test]
    fn accept_records_user() {
        let mut inv = pending();
        let user = UserId::new("u-1").unwrap();
        inv.accept(user.clone(), t0().add_days(1)).unwrap();
        assert_eq!(inv.status, InvitationStatus::Accepted);
        assert_eq!(inv.accepted_by, Some(user));
    }

    #[test]
    fn accept_twice_fails() {
        let mut inv = pending();
        inv.accept(UserId::new("u-1").unwrap(), t0()).unwrap();
        let err = inv.accept(UserId::new("u-2").unwrap(), t0()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn expired_invitation_cannot_be_accepted() {
        let mut inv = pending();
        inv.expire(t0()).unwrap();
        assert!(inv.accept(UserId::new("u-1").unwrap(), t0()).is_err());
    }

    #[test]
    fn cancelled_invitation_cannot_expire() {
        let mut inv = pending();
        inv.cancel(t0()).unwrap();
        assert!(inv.expire(t0()).is_err());
        assert_eq!(inv.status, InvitationStatus::Cancelled);
    }
}
