//! Invitation domain module.
//!
//! # Module Structure
//!
//! - `code` - 8-character human-enterable invitation codes
//! - `status` - InvitationStatus state machine
//! - `aggregate` - Invitation aggregate
//! - `validator` - Pure evaluation of a presented invitation

mod aggregate;
mod code;
mod status;
mod validator;

pub use aggregate::Invitation;
pub use code::{InvitationCode, CODE_ALPHABET, CODE_LENGTH};
pub use status::InvitationStatus;
pub use validator::{evaluate, EvaluationInput, InvitationDecision, InvitationRejection};
