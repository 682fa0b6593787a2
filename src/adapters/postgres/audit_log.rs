//! PostgreSQL implementation of AuditSink. Insert-only.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{db_error, optional_user_id, parse_column, user_id};
use crate::domain::audit::AuditRecord;
use crate::domain::foundation::{AuditRecordId, DomainError, TenantId, Timestamp};
use crate::ports::AuditSink;

pub struct PostgresAuditLog {
    pool: PgPool,
}

impl PostgresAuditLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    action: String,
    actor_id: String,
    target_user_id: Option<String>,
    tenant_id: Option<Uuid>,
    occurred_at: DateTime<Utc>,
    details: Json<BTreeMap<String, String>>,
}

impl TryFrom<AuditRow> for AuditRecord {
    type Error = DomainError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(AuditRecord {
            id: AuditRecordId::from_uuid(row.id),
            action: parse_column("action", &row.action)?,
            actor_id: user_id("actor_id", row.actor_id)?,
            target_user_id: optional_user_id("target_user_id", row.target_user_id)?,
            tenant_id: row.tenant_id.map(TenantId::from_uuid),
            timestamp: Timestamp::from_datetime(row.occurred_at),
            details: row.details.0,
        })
    }
}

#[async_trait]
impl AuditSink for PostgresAuditLog {
    async fn append(&self, record: &AuditRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, action, actor_id, target_user_id, tenant_id, occurred_at, details)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.action.as_str())
        .bind(record.actor_id.as_str())
        .bind(record.target_user_id.as_ref().map(|u| u.as_str()))
        .bind(record.tenant_id.map(|t| *t.as_uuid()))
        .bind(record.timestamp.as_datetime())
        .bind(Json(&record.details))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("append audit record", e))?;

        Ok(())
    }

    async fn list_for_tenant(&self, tenant_id: TenantId) -> Result<Vec<AuditRecord>, DomainError> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            r#"
            SELECT id, action, actor_id, target_user_id, tenant_id, occurred_at, details
            FROM audit_log
            WHERE tenant_id = $1
            ORDER BY occurred_at, id
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list audit records", e))?;

        rows.into_iter().map(AuditRecord::try_from).collect()
    }
}
