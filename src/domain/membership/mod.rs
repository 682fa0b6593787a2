//! Membership domain module.
//!
//! Handles the (user, tenant) relationship lifecycle and the roles it carries.
//!
//! # Module Structure
//!
//! - `aggregate` - Membership aggregate entity
//! - `status` - MembershipStatus state machine
//! - `role` - Roles and role-derived permissions
//! - `errors` - WorkspaceError surfaced by lifecycle operations

mod aggregate;
mod errors;
mod role;
mod status;

pub use aggregate::Membership;
pub use errors::{ResourceKind, WorkspaceError};
pub use role::{Permission, Role};
pub use status::MembershipStatus;
