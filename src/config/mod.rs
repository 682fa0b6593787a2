//! Application configuration module
//!
//! Configuration is read from environment variables with the
//! `WORKSPACE_ACCESS` prefix; nested values are separated by `__`.
//!
//! # Example
//!
//! ```no_run
//! use workspace_access::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod identity;
mod invitation;
mod logging;
mod reconciler;
mod server;

pub use database::{DatabaseConfig, StorageBackend};
pub use error::{ConfigError, ValidationError};
pub use identity::{IdentityConfig, MIN_SECRET_LEN};
pub use invitation::InvitationConfig;
pub use logging::LoggingConfig;
pub use reconciler::ReconcilerConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// Session tokens and bootstrap admin
    pub identity: IdentityConfig,

    #[serde(default)]
    pub invitation: InvitationConfig,

    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

impl AppConfig {
    /// Reads `.env` when present, then every `WORKSPACE_ACCESS__*` variable.
    /// Sections nest on `__`, so `WORKSPACE_ACCESS__DATABASE__BACKEND=postgres`
    /// sets `database.backend`.
    ///
    /// Fails when `identity.token_secret` is unset or a value does not parse.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("WORKSPACE_ACCESS")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.identity.validate(&self.server.environment)?;
        self.invitation.validate()?;
        self.reconciler.validate()?;
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: &[&str] = &[
        "WORKSPACE_ACCESS__IDENTITY__TOKEN_SECRET",
        "WORKSPACE_ACCESS__SERVER__PORT",
        "WORKSPACE_ACCESS__SERVER__ENVIRONMENT",
        "WORKSPACE_ACCESS__LOGGING__JSON",
        "WORKSPACE_ACCESS__DATABASE__BACKEND",
        "WORKSPACE_ACCESS__DATABASE__URL",
        "WORKSPACE_ACCESS__INVITATION__EXPIRY_DAYS",
        "WORKSPACE_ACCESS__RECONCILER__MAX_ATTEMPTS",
    ];

    fn set_minimal_env() {
        env::set_var(
            "WORKSPACE_ACCESS__IDENTITY__TOKEN_SECRET",
            "0123456789abcdef0123456789abcdef",
        );
    }

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    fn load_with(extra: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        set_minimal_env();
        for (key, value) in extra {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        clear_env();
        result
    }

    #[test]
    fn test_load_minimal_environment() {
        let config = load_with(&[]).unwrap();
        assert_eq!(config.database.backend, StorageBackend::Memory);
        assert_eq!(config.invitation.expiry_days, 7);
        assert_eq!(config.reconciler.max_attempts, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_defaults() {
        let config = load_with(&[]).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
    }

    #[test]
    fn test_custom_values() {
        let config = load_with(&[
            ("WORKSPACE_ACCESS__SERVER__PORT", "3000"),
            ("WORKSPACE_ACCESS__LOGGING__JSON", "true"),
            ("WORKSPACE_ACCESS__INVITATION__EXPIRY_DAYS", "14"),
            ("WORKSPACE_ACCESS__RECONCILER__MAX_ATTEMPTS", "3"),
        ])
        .unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(config.logging.json);
        assert_eq!(config.invitation.expiry_days, 14);
        assert_eq!(config.reconciler.max_attempts, 3);
    }

    #[test]
    fn test_is_production() {
        let config = load_with(&[("WORKSPACE_ACCESS__SERVER__ENVIRONMENT", "production")]).unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn test_postgres_backend_requires_url() {
        let config = load_with(&[("WORKSPACE_ACCESS__DATABASE__BACKEND", "postgres")]).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_missing_token_secret_fails_load() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        assert!(AppConfig::load().is_err());
    }
}
