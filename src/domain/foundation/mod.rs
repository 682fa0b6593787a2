//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types
//! that form the vocabulary of the workspace access domain.

mod contact;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use contact::Contact;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{AuditRecordId, InvitationId, TenantId, UserId};
pub use state_machine::{IllegalTransition, StateMachine};
pub use timestamp::Timestamp;
