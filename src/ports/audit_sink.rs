//! Audit sink port.
//!
//! Append-only. Records are never updated or deleted through this port.

use crate::domain::audit::AuditRecord;
use crate::domain::foundation::{DomainError, TenantId};
use async_trait::async_trait;

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, record: &AuditRecord) -> Result<(), DomainError>;

    /// Records for a tenant, oldest first.
    async fn list_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<AuditRecord>, DomainError>;
}
