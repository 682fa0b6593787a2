//! Startup configuration failures

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("configuration rejected: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// A loaded value that the service refuses to start with.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("WORKSPACE_ACCESS__{0} must be set")]
    MissingRequired(&'static str),

    // server
    #[error("server.host is not an IP address")]
    InvalidHost,
    #[error("server.port must be non-zero")]
    InvalidPort,
    #[error("server.request_timeout_secs must be within 1..=300")]
    InvalidTimeout,

    // database
    #[error("database.url must use the postgres:// or postgresql:// scheme")]
    InvalidDatabaseUrl,
    #[error("database.min_connections exceeds database.max_connections")]
    InvalidPoolSize,
    #[error("database.max_connections is capped at 100")]
    PoolSizeTooLarge,

    // identity
    #[error("identity.token_secret needs at least {0} bytes outside development")]
    WeakTokenSecret(usize),
    #[error("identity.token_ttl_secs must be non-zero")]
    InvalidTokenTtl,

    // invitation
    #[error("invitation.expiry_days must be within 1..=365")]
    InvalidExpiry,
    #[error("invitation.max_code_attempts must be non-zero")]
    InvalidCodeAttempts,

    // reconciler
    #[error("reconciler needs max_attempts > 0 and initial_backoff_ms <= max_backoff_ms")]
    InvalidRetryPolicy,
}
