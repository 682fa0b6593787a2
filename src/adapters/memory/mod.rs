//! In-memory store adapters.
//!
//! Back the `memory` database backend and the test suite. Each map sits
//! behind a `tokio::sync::RwLock`, giving per-document atomic writes.

mod audit_log;
mod invitation_store;
mod membership_store;
mod tenant_store;
mod user_directory;

pub use audit_log::InMemoryAuditLog;
pub use invitation_store::InMemoryInvitationStore;
pub use membership_store::InMemoryMembershipStore;
pub use tenant_store::InMemoryTenantStore;
pub use user_directory::InMemoryUserDirectory;
