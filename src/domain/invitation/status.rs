//! Invitation status state machine.
//!
//! `pending` is the only live state. `accepted`, `expired` and `cancelled`
//! are terminal, so a consumed or expired code can never be reused.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
    Cancelled,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Expired => "expired",
            InvitationStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for InvitationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvitationStatus::Pending),
            "accepted" => Ok(InvitationStatus::Accepted),
            "expired" => Ok(InvitationStatus::Expired),
            "cancelled" => Ok(InvitationStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "invitation_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

impl StateMachine for InvitationStatus {
    const STATES: &'static [Self] = &[
        InvitationStatus::Pending,
        InvitationStatus::Accepted,
        InvitationStatus::Expired,
        InvitationStatus::Cancelled,
    ];

    fn can_transition_to(&self, target: &Self) -> bool {
        use InvitationStatus::*;
        matches!(
            (self, target),
            (Pending, Accepted) | (Pending, Expired) | (Pending, Cancelled)
        )
    }
}
