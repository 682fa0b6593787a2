//! Tenancy module - tenants and the platform users who join them.

mod tenant;
mod user;

pub use tenant::{Tenant, TenantStatus};
pub use user::User;
