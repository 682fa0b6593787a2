//! Tenant and user handlers.
//!
//! - Tenants: create, delete (cascading to memberships and invitations)
//! - Users: register

mod create_tenant;
mod delete_tenant;
mod register_user;

pub use create_tenant::{CreateTenantCommand, CreateTenantHandler, CreateTenantResult};
pub use delete_tenant::{DeleteTenantCommand, DeleteTenantHandler, DeleteTenantResult};
pub use register_user::{RegisterUserCommand, RegisterUserHandler, RegisterUserResult};
