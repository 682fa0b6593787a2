//! PostgreSQL implementation of MembershipStore.
//!
//! Memberships are keyed by (user_id, tenant_id); the active-workspace
//! preference lives in `workspace_preferences`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{db_error, optional_user_id, parse_column, user_id};
use crate::domain::foundation::{DomainError, TenantId, Timestamp, UserId};
use crate::domain::membership::{Membership, MembershipStatus, Permission};
use crate::ports::MembershipStore;

pub struct PostgresMembershipStore {
    pool: PgPool,
}

impl PostgresMembershipStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT user_id, tenant_id, role, status, permissions, joined_at, invited_by,
           suspended_at, suspended_by, suspension_reason, reactivated_at, reactivated_by,
           created_at, updated_at
    FROM memberships
"#;

#[derive(Debug, sqlx::FromRow)]
struct MembershipRow {
    user_id: String,
    tenant_id: Uuid,
    role: String,
    status: String,
    permissions: Vec<String>,
    joined_at: DateTime<Utc>,
    invited_by: Option<String>,
    suspended_at: Option<DateTime<Utc>>,
    suspended_by: Option<String>,
    suspension_reason: Option<String>,
    reactivated_at: Option<DateTime<Utc>>,
    reactivated_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MembershipRow> for Membership {
    type Error = DomainError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        let permissions = row
            .permissions
            .iter()
            .map(|p| parse_column::<Permission>("permission", p))
            .collect::<Result<_, _>>()?;

        Ok(Membership {
            user_id: user_id("user_id", row.user_id)?,
            tenant_id: TenantId::from_uuid(row.tenant_id),
            role: parse_column("role", &row.role)?,
            status: parse_column("status", &row.status)?,
            permissions,
            joined_at: Timestamp::from_datetime(row.joined_at),
            invited_by: optional_user_id("invited_by", row.invited_by)?,
            suspended_at: row.suspended_at.map(Timestamp::from_datetime),
            suspended_by: optional_user_id("suspended_by", row.suspended_by)?,
            suspension_reason: row.suspension_reason,
            reactivated_at: row.reactivated_at.map(Timestamp::from_datetime),
            reactivated_by: optional_user_id("reactivated_by", row.reactivated_by)?,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn into_memberships(rows: Vec<MembershipRow>) -> Result<Vec<Membership>, DomainError> {
    rows.into_iter().map(Membership::try_from).collect()
}

#[async_trait]
impl MembershipStore for PostgresMembershipStore {
    async fn upsert(&self, membership: &Membership) -> Result<(), DomainError> {
        let permissions: Vec<&str> = membership.permissions.iter().map(|p| p.as_str()).collect();

        sqlx::query(
            r#"
            INSERT INTO memberships (
                user_id, tenant_id, role, status, permissions, joined_at, invited_by,
                suspended_at, suspended_by, suspension_reason, reactivated_at, reactivated_by,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (user_id, tenant_id) DO UPDATE SET
                role = EXCLUDED.role,
                status = EXCLUDED.status,
                permissions = EXCLUDED.permissions,
                joined_at = EXCLUDED.joined_at,
                invited_by = EXCLUDED.invited_by,
                suspended_at = EXCLUDED.suspended_at,
                suspended_by = EXCLUDED.suspended_by,
                suspension_reason = EXCLUDED.suspension_reason,
                reactivated_at = EXCLUDED.reactivated_at,
                reactivated_by = EXCLUDED.reactivated_by,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(membership.user_id.as_str())
        .bind(membership.tenant_id.as_uuid())
        .bind(membership.role.as_str())
        .bind(membership.status.as_str())
        .bind(&permissions)
        .bind(membership.joined_at.as_datetime())
        .bind(membership.invited_by.as_ref().map(UserId::as_str))
        .bind(membership.suspended_at.as_ref().map(Timestamp::as_datetime))
        .bind(membership.suspended_by.as_ref().map(UserId::as_str))
        .bind(&membership.suspension_reason)
        .bind(membership.reactivated_at.as_ref().map(Timestamp::as_datetime))
        .bind(membership.reactivated_by.as_ref().map(UserId::as_str))
        .bind(membership.created_at.as_datetime())
        .bind(membership.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("upsert membership", e))?;

        Ok(())
    }

    async fn find(
        &self,
        user_id: &UserId,
        tenant_id: TenantId,
    ) -> Result<Option<Membership>, DomainError> {
        let row: Option<MembershipRow> =
            sqlx::query_as(&format!("{} WHERE user_id = $1 AND tenant_id = $2", SELECT_COLUMNS))
                .bind(user_id.as_str())
                .bind(tenant_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("find membership", e))?;

        row.map(Membership::try_from).transpose()
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Membership>, DomainError> {
        let rows: Vec<MembershipRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = $1 ORDER BY joined_at, tenant_id",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list memberships by user", e))?;

        into_memberships(rows)
    }

    async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<Membership>, DomainError> {
        let rows: Vec<MembershipRow> = sqlx::query_as(&format!(
            "{} WHERE tenant_id = $1 ORDER BY user_id",
            SELECT_COLUMNS
        ))
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list memberships by tenant", e))?;

        into_memberships(rows)
    }

    async fn list_by_status(
        &self,
        status: MembershipStatus,
    ) -> Result<Vec<Membership>, DomainError> {
        let rows: Vec<MembershipRow> = sqlx::query_as(&format!(
            "{} WHERE status = $1 ORDER BY user_id, tenant_id",
            SELECT_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list memberships by status", e))?;

        into_memberships(rows)
    }

    async fn delete(&self, user_id: &UserId, tenant_id: TenantId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM memberships WHERE user_id = $1 AND tenant_id = $2")
            .bind(user_id.as_str())
            .bind(tenant_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete membership", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<UserId>, DomainError> {
        let removed: Vec<String> =
            sqlx::query_scalar("DELETE FROM memberships WHERE tenant_id = $1 RETURNING user_id")
                .bind(tenant_id.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_error("delete tenant memberships", e))?;

        removed
            .into_iter()
            .map(|raw| user_id("user_id", raw))
            .collect()
    }

    async fn get_active_tenant(&self, user_id: &UserId) -> Result<Option<TenantId>, DomainError> {
        let tenant: Option<Uuid> =
            sqlx::query_scalar("SELECT tenant_id FROM workspace_preferences WHERE user_id = $1")
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("read workspace preference", e))?;

        Ok(tenant.map(TenantId::from_uuid))
    }

    async fn set_active_tenant(
        &self,
        user_id: &UserId,
        tenant_id: Option<TenantId>,
    ) -> Result<(), DomainError> {
        let query = match tenant_id {
            Some(tenant_id) => sqlx::query(
                r#"
                INSERT INTO workspace_preferences (user_id, tenant_id, updated_at)
                VALUES ($1, $2, NOW())
                ON CONFLICT (user_id) DO UPDATE SET
                    tenant_id = EXCLUDED.tenant_id,
                    updated_at = EXCLUDED.updated_at
                "#,
            )
            .bind(user_id.as_str())
            .bind(*tenant_id.as_uuid()),
            None => sqlx::query("DELETE FROM workspace_preferences WHERE user_id = $1")
                .bind(user_id.as_str()),
        };

        query
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("write workspace preference", e))?;

        Ok(())
    }
}
