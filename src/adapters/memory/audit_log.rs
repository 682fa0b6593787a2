//! In-memory append-only audit log.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::audit::{AuditAction, AuditRecord};
use crate::domain::foundation::{DomainError, TenantId};
use crate::ports::AuditSink;

#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    pub async fn records(&self) -> Vec<AuditRecord> {
        self.records.read().await.clone()
    }

    pub async fn actions(&self) -> Vec<AuditAction> {
        self.records.read().await.iter().map(|r| r.action).collect()
    }

    pub async fn count_of(&self, action: AuditAction) -> usize {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.action == action)
            .count()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditLog {
    async fn append(&self, record: &AuditRecord) -> Result<(), DomainError> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn list_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<AuditRecord>, DomainError> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.tenant_id == Some(tenant_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Timestamp, UserId};

    #[tokio::test]
    async fn appends_in_order_and_filters_by_tenant() {
        let log = InMemoryAuditLog::new();
        let tenant = TenantId::new();
        let actor = UserId::new("admin").unwrap();

        log.append(&AuditRecord::new(AuditAction::TenantCreated, actor.clone(), Timestamp::now()).tenant(tenant))
            .await
            .unwrap();
        log.append(&AuditRecord::new(AuditAction::TenantCreated, actor.clone(), Timestamp::now()).tenant(TenantId::new()))
            .await
            .unwrap();
        log.append(&AuditRecord::new(AuditAction::InvitationCreated, actor, Timestamp::now()).tenant(tenant))
            .await
            .unwrap();

        let for_tenant = log.list_for_tenant(tenant).await.unwrap();
        assert_eq!(
            for_tenant.iter().map(|r| r.action).collect::<Vec<_>>(),
            vec![AuditAction::TenantCreated, AuditAction::InvitationCreated]
        );
        assert_eq!(log.count_of(AuditAction::TenantCreated).await, 2);
    }
}
