//! Identity provider configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Shortest HS256 secret accepted outside development.
pub const MIN_SECRET_LEN: usize = 32;

/// Session token issuing and the optional bootstrap administrator.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// HS256 signing secret for session tokens
    pub token_secret: SecretString,

    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,

    /// User created with the super admin role at startup
    pub bootstrap_admin_id: Option<String>,

    pub bootstrap_admin_email: Option<String>,
}

impl IdentityConfig {
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        let secret = self.token_secret.expose_secret();
        if secret.is_empty() {
            return Err(ValidationError::MissingRequired("IDENTITY__TOKEN_SECRET"));
        }
        if *environment != Environment::Development && secret.len() < MIN_SECRET_LEN {
            return Err(ValidationError::WeakTokenSecret(MIN_SECRET_LEN));
        }
        if self.token_ttl_secs == 0 {
            return Err(ValidationError::InvalidTokenTtl);
        }
        Ok(())
    }
}

fn default_issuer() -> String {
    "workspace-access".to_string()
}

fn default_token_ttl() -> u64 {
    3600
}
