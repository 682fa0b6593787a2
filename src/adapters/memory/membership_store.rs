//! In-memory membership store.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, TenantId, UserId};
use crate::domain::membership::{Membership, MembershipStatus};
use crate::ports::MembershipStore;

/// Memberships keyed by `(user_id, tenant_id)`, so a pair can only ever
/// hold one document.
#[derive(Debug, Default)]
pub struct InMemoryMembershipStore {
    memberships: RwLock<BTreeMap<(UserId, TenantId), Membership>>,
    preferences: RwLock<HashMap<UserId, TenantId>>,
}

impl InMemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored memberships (for test assertions).
    pub async fn len(&self) -> usize {
        self.memberships.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.memberships.read().await.is_empty()
    }
}

#[async_trait]
impl MembershipStore for InMemoryMembershipStore {
    async fn upsert(&self, membership: &Membership) -> Result<(), DomainError> {
        self.memberships.write().await.insert(
            (membership.user_id.clone(), membership.tenant_id),
            membership.clone(),
        );
        Ok(())
    }

    async fn find(
        &self,
        user_id: &UserId,
        tenant_id: TenantId,
    ) -> Result<Option<Membership>, DomainError> {
        Ok(self
            .memberships
            .read()
            .await
            .get(&(user_id.clone(), tenant_id))
            .cloned())
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Membership>, DomainError> {
        Ok(self
            .memberships
            .read()
            .await
            .values()
            .filter(|m| &m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<Membership>, DomainError> {
        Ok(self
            .memberships
            .read()
            .await
            .values()
            .filter(|m| m.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn list_by_status(
        &self,
        status: MembershipStatus,
    ) -> Result<Vec<Membership>, DomainError> {
        Ok(self
            .memberships
            .read()
            .await
            .values()
            .filter(|m| m.status == status)
            .cloned()
            .collect())
    }

    async fn delete(&self, user_id: &UserId, tenant_id: TenantId) -> Result<bool, DomainError> {
        Ok(self
            .memberships
            .write()
            .await
            .remove(&(user_id.clone(), tenant_id))
            .is_some())
    }

    async fn delete_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<UserId>, DomainError> {
        let mut memberships = self.memberships.write().await;
        let mut removed = Vec::new();
        memberships.retain(|(user_id, t), _| {
            if *t == tenant_id {
                removed.push(user_id.clone());
                false
            } else {
                true
            }
        });
        Ok(removed)
    }

    async fn get_active_tenant(&self, user_id: &UserId) -> Result<Option<TenantId>, DomainError> {
        Ok(self.preferences.read().await.get(user_id).copied())
    }

    async fn set_active_tenant(
        &self,
        user_id: &UserId,
        tenant_id: Option<TenantId>,
    ) -> Result<(), DomainError> {
        let mut preferences = self.preferences.write().await;
        match tenant_id {
            Some(tenant_id) => {
                preferences.insert(user_id.clone(), tenant_id);
            }
            None => {
                preferences.remove(user_id);
            }
        }
        Ok(())
    }
}
