//! PostgreSQL implementation of InvitationStore.
//!
//! Status changes go through `update_if_status`, an UPDATE guarded by the
//! expected status, so two concurrent accepts cannot both succeed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    contact_from_row, contact_kind, db_error, is_unique_violation, optional_user_id,
    parse_column, user_id,
};
use crate::domain::foundation::{DomainError, ErrorCode, InvitationId, TenantId, Timestamp, UserId};
use crate::domain::invitation::{Invitation, InvitationCode, InvitationStatus};
use crate::ports::InvitationStore;

pub struct PostgresInvitationStore {
    pool: PgPool,
}

impl PostgresInvitationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, code, tenant_id, contact_kind, contact_value, role, status, invited_by,
           created_at, expires_at, accepted_by, accepted_at, updated_at
    FROM invitations
"#;

#[derive(Debug, sqlx::FromRow)]
struct InvitationRow {
    id: Uuid,
    code: String,
    tenant_id: Uuid,
    contact_kind: String,
    contact_value: String,
    role: String,
    status: String,
    invited_by: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    accepted_by: Option<String>,
    accepted_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<InvitationRow> for Invitation {
    type Error = DomainError;

    fn try_from(row: InvitationRow) -> Result<Self, Self::Error> {
        Ok(Invitation {
            id: InvitationId::from_uuid(row.id),
            code: parse_column::<InvitationCode>("code", &row.code)?,
            tenant_id: TenantId::from_uuid(row.tenant_id),
            contact: contact_from_row(&row.contact_kind, &row.contact_value)?,
            role: parse_column("role", &row.role)?,
            status: parse_column("status", &row.status)?,
            invited_by: user_id("invited_by", row.invited_by)?,
            created_at: Timestamp::from_datetime(row.created_at),
            expires_at: Timestamp::from_datetime(row.expires_at),
            accepted_by: optional_user_id("accepted_by", row.accepted_by)?,
            accepted_at: row.accepted_at.map(Timestamp::from_datetime),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn into_invitations(rows: Vec<InvitationRow>) -> Result<Vec<Invitation>, DomainError> {
    rows.into_iter().map(Invitation::try_from).collect()
}

#[async_trait]
impl InvitationStore for PostgresInvitationStore {
    async fn insert(&self, invitation: &Invitation) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO invitations (
                id, code, tenant_id, contact_kind, contact_value, role, status, invited_by,
                created_at, expires_at, accepted_by, accepted_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(invitation.id.as_uuid())
        .bind(invitation.code.as_str())
        .bind(invitation.tenant_id.as_uuid())
        .bind(contact_kind(&invitation.contact))
        .bind(invitation.contact.value())
        .bind(invitation.role.as_str())
        .bind(invitation.status.as_str())
        .bind(invitation.invited_by.as_str())
        .bind(invitation.created_at.as_datetime())
        .bind(invitation.expires_at.as_datetime())
        .bind(invitation.accepted_by.as_ref().map(UserId::as_str))
        .bind(invitation.accepted_at.as_ref().map(Timestamp::as_datetime))
        .bind(invitation.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e, "invitations_pending_code_key") {
                return DomainError::new(ErrorCode::Conflict, "Invitation code already in use")
                    .with_detail("code", invitation.code.to_string());
            }
            if is_unique_violation(&e, "invitations_pkey") {
                return DomainError::new(ErrorCode::Conflict, "Invitation already exists")
                    .with_detail("id", invitation.id.to_string());
            }
            db_error("insert invitation", e)
        })?;

        Ok(())
    }

    async fn update_if_status(
        &self,
        invitation: &Invitation,
        expected: InvitationStatus,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE invitations SET
                status = $3,
                accepted_by = $4,
                accepted_at = $5,
                updated_at = $6
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(invitation.id.as_uuid())
        .bind(expected.as_str())
        .bind(invitation.status.as_str())
        .bind(invitation.accepted_by.as_ref().map(UserId::as_str))
        .bind(invitation.accepted_at.as_ref().map(Timestamp::as_datetime))
        .bind(invitation.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update invitation", e))?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Distinguish a lost race from a missing row.
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM invitations WHERE id = $1")
            .bind(invitation.id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find invitation", e))?;

        match exists {
            Some(_) => Ok(false),
            None => Err(DomainError::new(ErrorCode::InvitationNotFound, "Invitation not found")
                .with_detail("id", invitation.id.to_string())),
        }
    }

    async fn find_by_id(&self, id: InvitationId) -> Result<Option<Invitation>, DomainError> {
        let row: Option<InvitationRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("find invitation", e))?;

        row.map(Invitation::try_from).transpose()
    }

    async fn find_by_code(&self, code: &InvitationCode) -> Result<Option<Invitation>, DomainError> {
        // Prefer the pending invitation, then the newest historical one.
        let row: Option<InvitationRow> = sqlx::query_as(&format!(
            "{} WHERE code = $1 ORDER BY (status = 'pending') DESC, created_at DESC LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find invitation by code", e))?;

        row.map(Invitation::try_from).transpose()
    }

    async fn code_in_use(&self, code: &InvitationCode) -> Result<bool, DomainError> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM invitations WHERE code = $1 AND status = 'pending')",
        )
        .bind(code.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("check invitation code", e))
    }

    async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<Invitation>, DomainError> {
        let rows: Vec<InvitationRow> = sqlx::query_as(&format!(
            "{} WHERE tenant_id = $1 ORDER BY created_at",
            SELECT_COLUMNS
        ))
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list invitations", e))?;

        into_invitations(rows)
    }

    async fn list_overdue(&self, now: Timestamp) -> Result<Vec<Invitation>, DomainError> {
        let rows: Vec<InvitationRow> = sqlx::query_as(&format!(
            "{} WHERE status = 'pending' AND expires_at < $1 ORDER BY expires_at",
            SELECT_COLUMNS
        ))
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list overdue invitations", e))?;

        into_invitations(rows)
    }

    async fn delete_by_tenant(&self, tenant_id: TenantId) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM invitations WHERE tenant_id = $1")
            .bind(tenant_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete tenant invitations", e))?;

        Ok(result.rows_affected())
    }
}
