//! Pure invitation evaluation.
//!
//! Decides whether a presented invitation may be used and whether it leads to
//! a first-time join or to restoring a suspended membership. Lookup and the
//! persistence of lazy expiry live in the application layer.

use crate::domain::foundation::{Contact, Timestamp, UserId};
use crate::domain::membership::{Membership, WorkspaceError};

use super::{Invitation, InvitationStatus};

/// Which lifecycle path an accepted invitation takes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvitationDecision {
    /// First time joining the tenant (or promoting a pre-provisioned membership).
    NewJoin,

    /// Restoring access for a user whose membership is suspended.
    Reactivation { user_id: UserId },
}

/// Why an invitation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationRejection {
    /// Already accepted or cancelled.
    NotPending,

    /// Already marked expired by an earlier use or the sweep.
    Expired,

    /// Pending but past its expiry; the caller must persist `expired`.
    Overdue,

    ContactMismatch,
}

impl InvitationRejection {
    pub fn into_error(self, code: &str) -> WorkspaceError {
        match self {
            InvitationRejection::NotPending => WorkspaceError::invitation_invalid(code),
            InvitationRejection::Overdue | InvitationRejection::Expired => {
                WorkspaceError::invitation_expired(code)
            }
            InvitationRejection::ContactMismatch => WorkspaceError::ContactMismatch,
        }
    }
}

/// Everything evaluation needs, already loaded.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationInput<'a> {
    pub invitation: &'a Invitation,
    pub now: Timestamp,

    /// Contact the caller typed in, if any.
    pub presented_contact: Option<&'a Contact>,

    /// Membership, in the invitation's tenant, of the user the invitation's
    /// contact resolves to.
    pub target_membership: Option<&'a Membership>,
}

/// Evaluates an invitation in order: status, expiry, contact, reactivation.
pub fn evaluate(input: EvaluationInput<'_>) -> Result<InvitationDecision, InvitationRejection> {
    let invitation = input.invitation;

    match invitation.status {
        InvitationStatus::Pending => {}
        InvitationStatus::Expired => return Err(InvitationRejection::Expired),
        InvitationStatus::Accepted | InvitationStatus::Cancelled => {
            return Err(InvitationRejection::NotPending)
        }
    }

    if invitation.is_overdue(input.now) {
        return Err(InvitationRejection::Overdue);
    }

    if let Some(contact) = input.presented_contact {
        if *contact != invitation.contact {
            return Err(InvitationRejection::ContactMismatch);
        }
    }

    match input.target_membership {
        Some(m) if m.tenant_id == invitation.tenant_id && m.is_suspended() => {
            Ok(InvitationDecision::Reactivation {
                user_id: m.user_id.clone(),
            })
        }
        _ => Ok(InvitationDecision::NewJoin),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{InvitationId, TenantId};
    use crate::domain::invitation::InvitationCode;
    use crate::domain::membership::Role;

    fn t0() -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000)
    }

    fn invitation(tenant: TenantId) -> Invitation {
        Invitation::issue(
            InvitationId::new(),
            InvitationCode::parse("ABC123DE").unwrap(),
            tenant,
            Contact::email("jane@example.com").unwrap(),
            Role::Employee,
            UserId::new("admin").unwrap(),
            t0(),
            7,
        )
    }

    fn input<'a>(inv: &'a Invitation, now: Timestamp) -> EvaluationInput<'a> {
        EvaluationInput {
            invitation: inv,
            now,
            presented_contact: None,
            target_membership: None,
        }
    }

    #[test]
    fn fresh_invitation_is_new_join() {
        let inv = invitation(TenantId::new());
        assert_eq!(evaluate(input(&inv, t0())), Ok(InvitationDecision::NewJoin));
    }

    #[test]
    fn accepted_invitation_is_not_pending() {
        let mut inv = invitation(TenantId::new());
        inv.accept(UserId::new("u-1").unwrap(), t0()).unwrap();
        assert_eq!(evaluate(input(&inv, t0())), Err(InvitationRejection::NotPending));
    }

    #[test]
    fn status_is_checked_before_expiry() {
        let mut inv = invitation(TenantId::new());
        inv.cancel(t0()).unwrap();
        let late = t0().add_days(30);
        assert_eq!(evaluate(input(&inv, late)), Err(InvitationRejection::NotPending));
    }

    #[test]
    fn expired_invitation_stays_expired() {
        let mut inv = invitation(TenantId::new());
        inv.expire(t0()).unwrap();
        assert_eq!(evaluate(input(&inv, t0())), Err(InvitationRejection::Expired));
    }

    #[test]
    fn overdue_invitation_is_rejected() {
        let inv = invitation(TenantId::new());
        let late = t0().add_days(8);
        assert_eq!(evaluate(input(&inv, late)), Err(InvitationRejection::Overdue));
    }

    #[test]
    fn different_contact_is_rejected() {
        let inv = invitation(TenantId::new());
        let other = Contact::email("someone.else@example.com").unwrap();
        let mut i = input(&inv, t0());
        i.presented_contact = Some(&other);
        assert_eq!(evaluate(i), Err(InvitationRejection::ContactMismatch));
    }

    #[test]
    fn matching_contact_passes() {
        let inv = invitation(TenantId::new());
        let same = Contact::email("JANE@example.com").unwrap();
        let mut i = input(&inv, t0());
        i.presented_contact = Some(&same);
        assert_eq!(evaluate(i), Ok(InvitationDecision::NewJoin));
    }

    #[test]
    fn suspended_membership_routes_to_reactivation() {
        let tenant = TenantId::new();
        let inv = invitation(tenant);
        let user = UserId::new("u-1").unwrap();
        let mut m = Membership::active(user.clone(), tenant, Role::Employee, None, t0());
        m.suspend(UserId::new("admin").unwrap(), None, t0()).unwrap();

        let mut i = input(&inv, t0());
        i.target_membership = Some(&m);
        assert_eq!(evaluate(i), Ok(InvitationDecision::Reactivation { user_id: user }));
    }

    #[test]
    fn invited_membership_stays_new_join() {
        let tenant = TenantId::new();
        let inv = invitation(tenant);
        let m = Membership::invited(
            UserId::new("u-1").unwrap(),
            tenant,
            Role::Employee,
            UserId::new("admin").unwrap(),
            t0(),
        );
        let mut i = input(&inv, t0());
        i.target_membership = Some(&m);
        assert_eq!(evaluate(i), Ok(InvitationDecision::NewJoin));
    }

    #[test]
    fn rejection_maps_to_workspace_error() {
        assert_eq!(
            InvitationRejection::Overdue.into_error("ABC123DE"),
            WorkspaceError::invitation_expired("ABC123DE")
        );
        assert_eq!(
            InvitationRejection::ContactMismatch.into_error("ABC123DE"),
            WorkspaceError::ContactMismatch
        );
    }
}
