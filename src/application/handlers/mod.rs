//! Application handlers.
//!
//! Command and query handlers grouped by the aggregate they drive.

pub mod membership;
pub mod tenancy;

#[cfg(test)]
pub(crate) mod test_support;

pub use membership::*;
pub use tenancy::*;
