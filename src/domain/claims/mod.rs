//! Session claims: the denormalized view of a user's memberships.
//!
//! Claims are a cache. They are only ever produced by [`derive_claims`] from
//! store state and overwritten whole.

mod derivation;
mod session_claims;

pub use derivation::{derive_claims, select_active_tenant, ClaimsSource};
pub use session_claims::{ActiveTenant, LegacyClaims, SessionClaims, WorkspaceClaim};
