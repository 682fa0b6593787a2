//! Tenant store port.

use crate::domain::foundation::{DomainError, TenantId};
use crate::domain::tenancy::Tenant;
use async_trait::async_trait;
use std::collections::BTreeMap;

#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Insert a new tenant.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the id or auth namespace is taken
    async fn insert(&self, tenant: &Tenant) -> Result<(), DomainError>;

    async fn find(&self, tenant_id: TenantId) -> Result<Option<Tenant>, DomainError>;

    async fn list(&self) -> Result<Vec<Tenant>, DomainError>;

    /// Auth namespaces for the given tenants. Unknown ids are omitted.
    async fn namespaces(
        &self,
        tenant_ids: &[TenantId],
    ) -> Result<BTreeMap<TenantId, String>, DomainError>;

    /// Returns false if there was no such tenant.
    async fn delete(&self, tenant_id: TenantId) -> Result<bool, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenant_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn TenantStore) {}
    }
}
