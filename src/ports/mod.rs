//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Store Ports
//!
//! - `MembershipStore` - Memberships and active-workspace preferences
//! - `InvitationStore` - Invitations, with compare-and-set status updates
//! - `TenantStore` - Tenants and their auth namespaces
//! - `UserDirectory` - Platform users, resolvable by contact
//!
//! ## External Systems
//!
//! - `IdentityProvider` - Session tokens and the per-user claims payload
//! - `AuditSink` - Append-only audit trail

mod audit_sink;
mod identity_provider;
mod invitation_store;
mod membership_store;
mod tenant_store;
mod user_directory;

pub use audit_sink::AuditSink;
pub use identity_provider::{IdentityError, IdentityProvider, VerifiedSession};
pub use invitation_store::InvitationStore;
pub use membership_store::MembershipStore;
pub use tenant_store::TenantStore;
pub use user_directory::UserDirectory;
