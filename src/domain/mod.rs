//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `tenancy` - Tenants and platform users
//! - `membership` - Membership lifecycle, roles, and workspace errors
//! - `invitation` - Invitation codes, lifecycle, and evaluation
//! - `claims` - Session claims and their pure derivation
//! - `audit` - Append-only audit records

pub mod audit;
pub mod claims;
pub mod foundation;
pub mod invitation;
pub mod membership;
pub mod tenancy;
