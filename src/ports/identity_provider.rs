//! Identity provider port.
//!
//! The identity provider issues session tokens and stores an opaque claims
//! payload per user. Claims written here are not visible in tokens issued
//! earlier; clients must fetch a fresh token to see them.
//!
//! # Contract
//!
//! Implementations must:
//! - Replace the whole payload on `set_claims`, never merge
//! - Return `IdentityError::Unavailable` for transient failures
//! - Validate signature and expiry in `verify_session_token`

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{Timestamp, UserId};

/// Result of verifying a session token.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedSession {
    pub user_id: UserId,

    /// Claims as embedded at issue time. May be stale.
    pub claims_snapshot: serde_json::Value,

    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
}

/// Identity provider failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The token is malformed or its signature doesn't verify.
    #[error("Invalid session token")]
    InvalidToken,

    #[error("Session token expired")]
    TokenExpired,

    #[error("User not found in identity provider")]
    UserNotFound,

    /// The provider refused the request for a non-transient reason.
    #[error("Identity provider rejected request: {0}")]
    Rejected(String),

    /// The provider is unreachable or timed out.
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

impl IdentityError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Returns true if this is a transient error that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, IdentityError::Unavailable(_))
    }

    /// Returns true if the client should authenticate again.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            IdentityError::InvalidToken | IdentityError::TokenExpired | IdentityError::UserNotFound
        )
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current claims payload, or `None` if none was ever written.
    async fn get_claims(&self, user_id: &UserId) -> Result<Option<serde_json::Value>, IdentityError>;

    /// Replace the user's claims payload.
    async fn set_claims(
        &self,
        user_id: &UserId,
        payload: serde_json::Value,
    ) -> Result<(), IdentityError>;

    /// Verify a raw session token (without the `Bearer ` prefix).
    async fn verify_session_token(&self, token: &str) -> Result<VerifiedSession, IdentityError>;
}
