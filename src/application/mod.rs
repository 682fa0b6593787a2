//! Application layer - Commands, Queries, and Handlers.
//!
//! Orchestrates domain operations across the store ports and the identity
//! provider. Each state-changing handler follows the same flow:
//! authorize, validate, write the store, emit audit, reconcile claims.

pub mod audit_trail;
mod authorization;
mod dispatcher;
pub mod handlers;
pub mod invitation_validator;
mod reconciler;
pub mod workspace_pointer;

pub use authorization::{Actor, Authorizer};
pub use dispatcher::{ActionDispatcher, ActionKind, ActionRequest, ActionResponse, Dependencies};
pub use invitation_validator::{InvitationRef, InvitationValidator, ValidatedInvitation};
pub use reconciler::{ClaimsReconciler, ReconcileReport, ResolvedSession, RetryPolicy};

pub use handlers::{InvitationPolicy, ExpireInvitationsCommand, ExpireInvitationsHandler};
