//! PostgreSQL implementation of TenantStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::{db_error, is_unique_violation, parse_column, user_id};
use crate::domain::foundation::{DomainError, ErrorCode, TenantId, Timestamp};
use crate::domain::tenancy::Tenant;
use crate::ports::TenantStore;

pub struct PostgresTenantStore {
    pool: PgPool,
}

impl PostgresTenantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TenantRow {
    id: Uuid,
    name: String,
    auth_namespace: String,
    status: String,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TenantRow> for Tenant {
    type Error = DomainError;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        Ok(Tenant {
            id: TenantId::from_uuid(row.id),
            name: row.name,
            auth_namespace: row.auth_namespace,
            status: parse_column("status", &row.status)?,
            created_by: user_id("created_by", row.created_by)?,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl TenantStore for PostgresTenantStore {
    async fn insert(&self, tenant: &Tenant) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO tenants (id, name, auth_namespace, status, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(tenant.id.as_uuid())
        .bind(&tenant.name)
        .bind(&tenant.auth_namespace)
        .bind(tenant.status.as_str())
        .bind(tenant.created_by.as_str())
        .bind(tenant.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "tenants_pkey")
                || is_unique_violation(&e, "tenants_auth_namespace_key")
            {
                return DomainError::new(ErrorCode::Conflict, "Tenant already exists")
                    .with_detail("auth_namespace", tenant.auth_namespace.clone());
            }
            db_error("insert tenant", e)
        })?;

        Ok(())
    }

    async fn find(&self, tenant_id: TenantId) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> = sqlx::query_as(
            "SELECT id, name, auth_namespace, status, created_by, created_at FROM tenants WHERE id = $1",
        )
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find tenant", e))?;

        row.map(Tenant::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Tenant>, DomainError> {
        let rows: Vec<TenantRow> = sqlx::query_as(
            "SELECT id, name, auth_namespace, status, created_by, created_at FROM tenants ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list tenants", e))?;

        rows.into_iter().map(Tenant::try_from).collect()
    }

    async fn namespaces(
        &self,
        tenant_ids: &[TenantId],
    ) -> Result<BTreeMap<TenantId, String>, DomainError> {
        if tenant_ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        let ids: Vec<Uuid> = tenant_ids.iter().map(|id| *id.as_uuid()).collect();

        let rows: Vec<(Uuid, String)> =
            sqlx::query_as("SELECT id, auth_namespace FROM tenants WHERE id = ANY($1)")
                .bind(&ids)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_error("load tenant namespaces", e))?;

        Ok(rows
            .into_iter()
            .map(|(id, namespace)| (TenantId::from_uuid(id), namespace))
            .collect())
    }

    async fn delete(&self, tenant_id: TenantId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(tenant_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete tenant", e))?;

        Ok(result.rows_affected() > 0)
    }
}
