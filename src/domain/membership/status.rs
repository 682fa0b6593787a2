//! Membership status state machine.
//!
//! Defines the lifecycle of a (user, tenant) relationship:
//! invited on pre-provisioning, active once access is granted,
//! suspended on deactivation.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    /// Pre-provisioned from an invitation; no access yet.
    Invited,

    /// Full access to the workspace.
    Active,

    /// Access revoked by an admin. Restored only with a fresh invitation.
    Suspended,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Invited => "invited",
            MembershipStatus::Active => "active",
            MembershipStatus::Suspended => "suspended",
        }
    }

    /// Returns true if this status grants access to the workspace.
    pub fn has_access(&self) -> bool {
        matches!(self, MembershipStatus::Active)
    }

    /// Returns true if memberships in this status are projected into claims.
    pub fn is_visible_in_claims(&self) -> bool {
        matches!(self, MembershipStatus::Active | MembershipStatus::Invited)
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MembershipStatus {
    type Err = crate::domain::foundation::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invited" => Ok(MembershipStatus::Invited),
            "active" => Ok(MembershipStatus::Active),
            "suspended" => Ok(MembershipStatus::Suspended),
            other => Err(crate::domain::foundation::ValidationError::invalid_format(
                "membership_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for MembershipStatus {
    const STATES: &'static [Self] = &[
        MembershipStatus::Invited,
        MembershipStatus::Active,
        MembershipStatus::Suspended,
    ];

    fn can_transition_to(&self, target: &Self) -> bool {
        use MembershipStatus::*;
        matches!(
            (self, target),
            (Invited, Active) | (Invited, Suspended) | (Active, Suspended) | (Suspended, Active)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invited_can_transition_to_active() {
        let result = MembershipStatus::Invited.transition_to(MembershipStatus::Active);
        assert_eq!(result, Ok(MembershipStatus::Active));
    }

    #[test]
    fn active_can_be_suspended() {
        let result = MembershipStatus::Active.transition_to(MembershipStatus::Suspended);
        assert_eq!(result, Ok(MembershipStatus::Suspended));
    }

    #[test]
    fn suspended_can_be_reactivated() {
        let result = MembershipStatus::Suspended.transition_to(MembershipStatus::Active);
        assert_eq!(result, Ok(MembershipStatus::Active));
    }

    #[test]
    fn suspended_cannot_return_to_invited() {
        assert!(MembershipStatus::Suspended
            .transition_to(MembershipStatus::Invited)
            .is_err());
    }

    #[test]
    fn active_cannot_go_back_to_invited() {
        assert!(!MembershipStatus::Active.can_transition_to(&MembershipStatus::Invited));
    }

    #[test]
    fn no_status_is_terminal() {
        for status in [
            MembershipStatus::Invited,
            MembershipStatus::Active,
            MembershipStatus::Suspended,
        ] {
            assert!(!status.is_terminal());
        }
    }

    #[test]
    fn only_active_has_access() {
        assert!(MembershipStatus::Active.has_access());
        assert!(!MembershipStatus::Invited.has_access());
        assert!(!MembershipStatus::Suspended.has_access());
    }

    #[test]
    fn suspended_is_hidden_from_claims() {
        assert!(MembershipStatus::Invited.is_visible_in_claims());
        assert!(!MembershipStatus::Suspended.is_visible_in_claims());
    }

    #[test]
    fn invited_may_be_withdrawn_before_acceptance() {
        assert_eq!(
            MembershipStatus::Invited.valid_transitions(),
            vec![MembershipStatus::Active, MembershipStatus::Suspended]
        );
    }
}
