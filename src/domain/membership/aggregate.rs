//! Membership aggregate entity.
//!
//! A Membership is the relationship between one user and one tenant.
//!
//! # Invariants
//!
//! - At most one Membership per `(user_id, tenant_id)`; stores upsert on that pair
//! - Status transitions follow the `MembershipStatus` state machine
//! - `updated_at` is stamped on every mutation and decides last-write-wins

use crate::domain::foundation::{DomainError, ErrorCode, StateMachine, TenantId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{MembershipStatus, Permission, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub role: Role,
    pub status: MembershipStatus,

    /// Role-derived unless set explicitly with [`Membership::with_permissions`].
    pub permissions: BTreeSet<Permission>,

    /// When access was first granted. For invited memberships, when the
    /// invitation was issued.
    pub joined_at: Timestamp,
    pub invited_by: Option<UserId>,

    pub suspended_at: Option<Timestamp>,
    pub suspended_by: Option<UserId>,
    pub suspension_reason: Option<String>,

    pub reactivated_at: Option<Timestamp>,
    pub reactivated_by: Option<UserId>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Membership {
    /// Pre-provisions a membership for a user who has been sent an invitation.
    pub fn invited(
        user_id: UserId,
        tenant_id: TenantId,
        role: Role,
        invited_by: UserId,
        now: Timestamp,
    ) -> Self {
        Self::build(user_id, tenant_id, role, MembershipStatus::Invited, Some(invited_by), now)
    }

    /// Creates a membership that grants access immediately.
    pub fn active(
        user_id: UserId,
        tenant_id: TenantId,
        role: Role,
        invited_by: Option<UserId>,
        now: Timestamp,
    ) -> Self {
        Self::build(user_id, tenant_id, role, MembershipStatus::Active, invited_by, now)
    }

    fn build(
        user_id: UserId,
        tenant_id: TenantId,
        role: Role,
        status: MembershipStatus,
        invited_by: Option<UserId>,
        now: Timestamp,
    ) -> Self {
        Self {
            user_id,
            tenant_id,
            role,
            status,
            permissions: role.default_permissions(),
            joined_at: now,
            invited_by,
            suspended_at: None,
            suspended_by: None,
            suspension_reason: None,
            reactivated_at: None,
            reactivated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the role-derived permission set.
    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions = permissions.into_iter().collect();
        self
    }

    pub fn is_active(&self) -> bool {
        self.status.has_access()
    }

    pub fn is_suspended(&self) -> bool {
        self.status == MembershipStatus::Suspended
    }

    /// Promotes a pre-provisioned membership on first successful access grant.
    ///
    /// # Errors
    ///
    /// Returns error unless the membership is `Invited`.
    pub fn activate(&mut self, role: Role, now: Timestamp) -> Result<(), DomainError> {
        if self.status != MembershipStatus::Invited {
            return Err(self.invalid_transition(MembershipStatus::Active));
        }
        self.transition_to(MembershipStatus::Active)?;
        if role != self.role {
            self.role = role;
            self.permissions = role.default_permissions();
        }
        self.joined_at = now;
        self.updated_at = now;
        Ok(())
    }

    /// Suspends access, recording who did it and why.
    ///
    /// # Errors
    ///
    /// Returns error if the membership is already suspended.
    pub fn suspend(
        &mut self,
        actor: UserId,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        self.transition_to(MembershipStatus::Suspended)?;
        self.suspended_at = Some(now);
        self.suspended_by = Some(actor);
        self.suspension_reason = reason;
        self.updated_at = now;
        Ok(())
    }

    /// Restores access after suspension.
    ///
    /// The suspension record is kept for audit; only the reactivation
    /// fields are added.
    ///
    /// # Errors
    ///
    /// Returns error unless the membership is `Suspended`.
    pub fn reactivate(&mut self, actor: UserId, now: Timestamp) -> Result<(), DomainError> {
        if self.status != MembershipStatus::Suspended {
            return Err(self.invalid_transition(MembershipStatus::Active));
        }
        self.transition_to(MembershipStatus::Active)?;
        self.reactivated_at = Some(now);
        self.reactivated_by = Some(actor);
        self.updated_at = now;
        Ok(())
    }

    fn transition_to(&mut self, target: MembershipStatus) -> Result<(), DomainError> {
        self.status = self
            .status
            .transition_to(target)
            .map_err(|_| self.invalid_transition(target))?;
        Ok(())
    }

    fn invalid_transition(&self, target: MembershipStatus) -> DomainError {
        DomainError::new(
            ErrorCode::InvalidStateTransition,
            format!(
                "Cannot transition membership from {} to {}",
                self.status, target
            ),
        )
        .with_detail("user_id", self.user_id.to_string())
        .with_detail("tenant_id", self.tenant_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn t0() -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000)
    }

    #[test]
    fn invited_membership_has_role_permissions() {
        let m = Membership::invited(user("u-1"), TenantId::new(), Role::Employee, user("admin"), t0());
        assert_eq!(m.status, MembershipStatus::Invited);
        assert_eq!(m.permissions, Role::Employee.default_permissions());
        assert_eq!(m.invited_by, Some(user("admin")));
    }

    #[test]
    fn activate_promotes_invited_and_stamps_join() {
        let mut m = Membership::invited(user("u-1"), TenantId::new(), Role::Employee, user("admin"), t0());
        let later = t0().add_days(2);
        m.activate(Role::Employee, later).unwrap();
        assert!(m.is_active());
        assert_eq!(m.joined_at, later);
        assert_eq!(m.updated_at, later);
    }

    #[test]
    fn activate_applies_role_from_invitation() {
        let mut m = Membership::invited(user("u-1"), TenantId::new(), Role::Employee, user("admin"), t0());
        m.activate(Role::PartnerAdmin, t0()).unwrap();
        assert_eq!(m.role, Role::PartnerAdmin);
        assert!(m.permissions.contains(&Permission::MembersInvite));
    }

    #[test]
    fn activate_rejects_suspended_membership() {
        let mut m = Membership::active(user("u-1"), TenantId::new(), Role::Employee, None, t0());
        m.suspend(user("admin"), None, t0()).unwrap();
        let err = m.activate(Role::Employee, t0()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    #[test]
    fn suspend_records_actor_and_reason() {
        let mut m = Membership::active(user("u-1"), TenantId::new(), Role::Employee, None, t0());
        m.suspend(user("admin"), Some("left company".to_string()), t0().add_days(1))
            .unwrap();
        assert!(m.is_suspended());
        assert_eq!(m.suspended_by, Some(user("admin")));
        assert_eq!(m.suspension_reason.as_deref(), Some("left company"));
    }

    #[test]
    fn suspend_twice_fails() {
        let mut m = Membership::active(user("u-1"), TenantId::new(), Role::Employee, None, t0());
        m.suspend(user("admin"), None, t0()).unwrap();
        assert!(m.suspend(user("admin"), None, t0()).is_err());
    }

    #[test]
    fn reactivate_keeps_suspension_history() {
        let mut m = Membership::active(user("u-1"), TenantId::new(), Role::Employee, None, t0());
        m.suspend(user("admin"), None, t0().add_days(1)).unwrap();
        m.reactivate(user("admin"), t0().add_days(2)).unwrap();
        assert!(m.is_active());
        assert!(m.suspended_at.is_some());
        assert_eq!(m.reactivated_at, Some(t0().add_days(2)));
        assert_eq!(m.joined_at, t0());
    }

    #[test]
    fn reactivate_rejects_active_membership() {
        let mut m = Membership::active(user("u-1"), TenantId::new(), Role::Employee, None, t0());
        assert!(m.reactivate(user("admin"), t0()).is_err());
    }

    #[test]
    fn explicit_permissions_override_role_defaults() {
        let m = Membership::active(user("u-1"), TenantId::new(), Role::Employee, None, t0())
            .with_permissions([Permission::WorkspaceRead, Permission::WorkspaceWrite]);
        assert!(m.permissions.contains(&Permission::WorkspaceWrite));
    }
}
