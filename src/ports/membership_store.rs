//! Membership store port.
//!
//! Durable record of every (user, tenant) relationship, plus each user's
//! active-workspace preference.
//!
//! # Contract
//!
//! - At most one membership per `(user_id, tenant_id)`: `upsert` replaces
//! - Each single-document write is atomic; later writes win
//! - No transaction spans a membership write and an identity provider write

use crate::domain::foundation::{DomainError, TenantId, UserId};
use crate::domain::membership::{Membership, MembershipStatus};
use async_trait::async_trait;

#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Insert or replace the membership keyed by `(user_id, tenant_id)`.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn upsert(&self, membership: &Membership) -> Result<(), DomainError>;

    /// Find the membership for a pair. Returns `None` if absent.
    async fn find(
        &self,
        user_id: &UserId,
        tenant_id: TenantId,
    ) -> Result<Option<Membership>, DomainError>;

    /// All memberships of a user, in any status.
    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Membership>, DomainError>;

    /// All memberships of a tenant, in any status.
    async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<Membership>, DomainError>;

    /// All memberships in a given status, across tenants.
    async fn list_by_status(&self, status: MembershipStatus)
        -> Result<Vec<Membership>, DomainError>;

    /// Hard-delete one membership. Returns false if there was none.
    async fn delete(&self, user_id: &UserId, tenant_id: TenantId) -> Result<bool, DomainError>;

    /// Delete every membership of a tenant, returning the affected users.
    async fn delete_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<UserId>, DomainError>;

    /// The user's stored active-workspace selection.
    async fn get_active_tenant(&self, user_id: &UserId) -> Result<Option<TenantId>, DomainError>;

    /// Replace (or clear, with `None`) the user's active-workspace selection.
    async fn set_active_tenant(
        &self,
        user_id: &UserId,
        tenant_id: Option<TenantId>,
    ) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn MembershipStore) {}
    }
}
