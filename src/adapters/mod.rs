//! Adapters - Implementations of port interfaces.
//!
//! - `memory` - In-process stores for tests and the `memory` backend
//! - `postgres` - sqlx stores for the `postgres` backend
//! - `identity` - Local HS256 identity provider
//! - `http` - axum routes over the action dispatcher

pub mod http;
pub mod identity;
pub mod memory;
pub mod postgres;

pub use identity::LocalIdentityProvider;
pub use memory::{
    InMemoryAuditLog, InMemoryInvitationStore, InMemoryMembershipStore, InMemoryTenantStore,
    InMemoryUserDirectory,
};
pub use postgres::{
    PostgresAuditLog, PostgresInvitationStore, PostgresMembershipStore, PostgresTenantStore,
    PostgresUserDirectory,
};
