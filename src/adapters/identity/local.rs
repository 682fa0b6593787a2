//! Local identity provider.
//!
//! Keeps the per-user claims payload in memory and issues HS256 session
//! tokens that embed a snapshot of it. Stands in for a hosted provider in
//! development and tests, and supports fault injection for the retry path.
//!
//! # Example
//!
//! ```ignore
//! let idp = LocalIdentityProvider::new("workspace-access", &secret, 3600);
//! idp.set_claims(&user_id, claims.to_payload()).await?;
//! let token = idp.issue_token(&user_id).await?;
//! let session = idp.verify_session_token(&token).await?;
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::{IdentityError, IdentityProvider, VerifiedSession};

/// JWT body of a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionTokenClaims {
    sub: String,
    iss: String,
    iat: u64,
    exp: u64,

    /// Claims payload at issue time.
    #[serde(default)]
    claims: serde_json::Value,
}

pub struct LocalIdentityProvider {
    issuer: String,
    token_ttl_secs: u64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    claims: RwLock<HashMap<UserId, serde_json::Value>>,

    /// Number of upcoming `set_claims` calls that fail as unavailable.
    failing_writes: AtomicUsize,
    /// When set, every call fails as unavailable.
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl LocalIdentityProvider {
    pub fn new(issuer: impl Into<String>, secret: &SecretString, token_ttl_secs: u64) -> Self {
        let key = secret.expose_secret().as_bytes();
        Self {
            issuer: issuer.into(),
            token_ttl_secs,
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            claims: RwLock::new(HashMap::new()),
            failing_writes: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// Issues a session token carrying the user's current claims.
    pub async fn issue_token(&self, user_id: &UserId) -> Result<String, IdentityError> {
        self.check_available()?;
        let snapshot = self
            .claims
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or(serde_json::Value::Null);

        let now = Timestamp::now().as_unix_secs();
        let body = SessionTokenClaims {
            sub: user_id.to_string(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now + self.token_ttl_secs,
            claims: snapshot,
        };

        encode(&Header::new(Algorithm::HS256), &body, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign session token");
            IdentityError::Rejected(e.to_string())
        })
    }

    // === Fault injection ===

    /// Makes the next `count` claim writes fail with `Unavailable`.
    pub fn fail_next_writes(&self, count: usize) {
        self.failing_writes.store(count, Ordering::SeqCst);
    }

    /// Toggles a full outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful claim writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), IdentityError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IdentityError::unavailable("identity provider offline"));
        }
        Ok(())
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn get_claims(&self, user_id: &UserId) -> Result<Option<serde_json::Value>, IdentityError> {
        self.check_available()?;
        Ok(self.claims.read().await.get(user_id).cloned())
    }

    async fn set_claims(
        &self,
        user_id: &UserId,
        payload: serde_json::Value,
    ) -> Result<(), IdentityError> {
        self.check_available()?;
        if self.take_injected_failure() {
            tracing::debug!(user_id = %user_id, "Injected claims write failure");
            return Err(IdentityError::unavailable("injected write failure"));
        }
        self.claims.write().await.insert(user_id.clone(), payload);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn verify_session_token(&self, token: &str) -> Result<VerifiedSession, IdentityError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let data = decode::<SessionTokenClaims>(token, &self.decoding_key, &validation).map_err(
            |e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => {
                        tracing::debug!("Session token expired");
                        IdentityError::TokenExpired
                    }
                    ErrorKind::InvalidIssuer => {
                        tracing::warn!("Invalid issuer in session token");
                        IdentityError::InvalidToken
                    }
                    _ => {
                        tracing::warn!("Session token validation failed: {}", e);
                        IdentityError::InvalidToken
                    }
                }
            },
        )?;

        let body = data.claims;
        let user_id = UserId::new(&body.sub).map_err(|_| {
            tracing::warn!("Invalid user ID in session token: {}", body.sub);
            IdentityError::InvalidToken
        })?;

        Ok(VerifiedSession {
            user_id,
            claims_snapshot: body.claims,
            issued_at: Timestamp::from_unix_secs(body.iat),
            expires_at: Timestamp::from_unix_secs(body.exp),
        })
    }
}

impl std::fmt::Debug for LocalIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalIdentityProvider")
            .field("issuer", &self.issuer)
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish_non_exhaustive()
    }
}
