//! In-memory tenant store.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, TenantId};
use crate::domain::tenancy::Tenant;
use crate::ports::TenantStore;

#[derive(Debug, Default)]
pub struct InMemoryTenantStore {
    tenants: RwLock<BTreeMap<TenantId, Tenant>>,
}

impl InMemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn insert(&self, tenant: &Tenant) -> Result<(), DomainError> {
        let mut tenants = self.tenants.write().await;
        if tenants.contains_key(&tenant.id)
            || tenants
                .values()
                .any(|t| t.auth_namespace == tenant.auth_namespace)
        {
            return Err(DomainError::new(ErrorCode::Conflict, "Tenant already exists")
                .with_detail("auth_namespace", tenant.auth_namespace.clone()));
        }
        tenants.insert(tenant.id, tenant.clone());
        Ok(())
    }

    async fn find(&self, tenant_id: TenantId) -> Result<Option<Tenant>, DomainError> {
        Ok(self.tenants.read().await.get(&tenant_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Tenant>, DomainError> {
        Ok(self.tenants.read().await.values().cloned().collect())
    }

    async fn namespaces(
        &self,
        tenant_ids: &[TenantId],
    ) -> Result<BTreeMap<TenantId, String>, DomainError> {
        let tenants = self.tenants.read().await;
        Ok(tenant_ids
            .iter()
            .filter_map(|id| tenants.get(id).map(|t| (*id, t.auth_namespace.clone())))
            .collect())
    }

    async fn delete(&self, tenant_id: TenantId) -> Result<bool, DomainError> {
        Ok(self.tenants.write().await.remove(&tenant_id).is_some())
    }
}
