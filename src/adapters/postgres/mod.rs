//! PostgreSQL adapters - sqlx implementations of the store ports.
//!
//! - `PostgresMembershipStore` - memberships and active-workspace preferences
//! - `PostgresInvitationStore` - invitations with status compare-and-set
//! - `PostgresTenantStore` - tenants
//! - `PostgresUserDirectory` - users and their contact channels
//! - `PostgresAuditLog` - append-only audit records

mod audit_log;
mod invitation_store;
mod membership_store;
mod tenant_store;
mod user_directory;

pub use audit_log::PostgresAuditLog;
pub use invitation_store::PostgresInvitationStore;
pub use membership_store::PostgresMembershipStore;
pub use tenant_store::PostgresTenantStore;
pub use user_directory::PostgresUserDirectory;

use std::fmt::Display;
use std::str::FromStr;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;
use crate::domain::foundation::{Contact, DomainError, ErrorCode, UserId};

/// Opens the pool and applies pending migrations when configured.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DomainError> {
    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(&config.url)
        .await
        .map_err(|e| db_error("connect", e))?;

    if config.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Migration failed: {}", e))
            })?;
        tracing::info!("database migrations applied");
    }

    Ok(pool)
}

fn db_error(operation: &str, err: sqlx::Error) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Failed to {}: {}", operation, err),
    )
}

fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint() == Some(constraint),
        _ => false,
    }
}

/// A stored value that no longer parses into its domain type.
fn corrupt(column: &str, err: impl Display) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} value: {}", column, err),
    )
}

fn parse_column<T>(column: &str, raw: &str) -> Result<T, DomainError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse().map_err(|e| corrupt(column, e))
}

fn user_id(column: &str, raw: String) -> Result<UserId, DomainError> {
    UserId::new(raw).map_err(|e| corrupt(column, e))
}

fn optional_user_id(column: &str, raw: Option<String>) -> Result<Option<UserId>, DomainError> {
    raw.map(|raw| user_id(column, raw)).transpose()
}

fn contact_kind(contact: &Contact) -> &'static str {
    match contact {
        Contact::Email(_) => "email",
        Contact::Phone(_) => "phone",
    }
}

fn contact_from_row(kind: &str, value: &str) -> Result<Contact, DomainError> {
    match kind {
        "email" => Contact::email(value),
        "phone" => Contact::phone(value),
        other => return Err(corrupt("contact_kind", other)),
    }
    .map_err(|e| corrupt("contact_value", e))
}
