//! PostgreSQL implementation of UserDirectory.
//!
//! Contacts live in `user_contacts`, whose primary key makes each contact
//! belong to at most one user.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{contact_from_row, contact_kind, db_error, is_unique_violation, parse_column, user_id};
use crate::domain::foundation::{Contact, DomainError, ErrorCode, UserId};
use crate::domain::membership::Role;
use crate::domain::tenancy::User;
use crate::ports::UserDirectory;

pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load(&self, id: &str) -> Result<Option<User>, DomainError> {
        let row: Option<(String, String, Option<String>)> =
            sqlx::query_as("SELECT id, display_name, platform_role FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("find user", e))?;

        let Some((id, display_name, platform_role)) = row else {
            return Ok(None);
        };

        let contact_rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT kind, value FROM user_contacts WHERE user_id = $1 ORDER BY kind, value",
        )
        .bind(&id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("load user contacts", e))?;

        let contacts = contact_rows
            .iter()
            .map(|(kind, value)| contact_from_row(kind, value))
            .collect::<Result<Vec<_>, _>>()?;

        let platform_role = platform_role
            .as_deref()
            .map(|raw| parse_column::<Role>("platform_role", raw))
            .transpose()?;

        Ok(Some(User {
            id: user_id("id", id)?,
            display_name,
            contacts,
            platform_role,
        }))
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find(&self, user_id: &UserId) -> Result<Option<User>, DomainError> {
        self.load(user_id.as_str()).await
    }

    async fn find_by_contact(&self, contact: &Contact) -> Result<Option<User>, DomainError> {
        let owner: Option<String> =
            sqlx::query_scalar("SELECT user_id FROM user_contacts WHERE kind = $1 AND value = $2")
                .bind(contact_kind(contact))
                .bind(contact.value())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("find user by contact", e))?;

        match owner {
            Some(owner) => self.load(&owner).await,
            None => Ok(None),
        }
    }

    async fn upsert(&self, user: &User) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO users (id, display_name, platform_role)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                platform_role = EXCLUDED.platform_role
            "#,
        )
        .bind(user.id.as_str())
        .bind(&user.display_name)
        .bind(user.platform_role.map(|r| r.as_str()))
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("upsert user", e))?;

        sqlx::query("DELETE FROM user_contacts WHERE user_id = $1")
            .bind(user.id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("replace user contacts", e))?;

        for contact in &user.contacts {
            sqlx::query("INSERT INTO user_contacts (user_id, kind, value) VALUES ($1, $2, $3)")
                .bind(user.id.as_str())
                .bind(contact_kind(contact))
                .bind(contact.value())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e, "user_contacts_pkey") {
                        return DomainError::new(
                            ErrorCode::Conflict,
                            "Contact belongs to another user",
                        )
                        .with_detail("contact", contact.to_string());
                    }
                    db_error("insert user contact", e)
                })?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("commit user", e))?;

        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<UserId>, DomainError> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list users", e))?;

        ids.into_iter().map(|raw| user_id("id", raw)).collect()
    }
}
