//! Session-token middleware and extractors for axum.
//!
//! ```text
//! Request → auth_middleware → verifies Bearer token, injects VerifiedSession
//!                                      ↓
//!                              Handler → RequireSession reads it from extensions
//! ```
//!
//! Verification goes through the `IdentityProvider` port, so the hosted
//! provider and the local HS256 issuer plug in the same way.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::ports::{IdentityError, IdentityProvider, VerifiedSession};

pub type AuthState = Arc<dyn IdentityProvider>;

/// Verifies the Bearer token, if any.
///
/// A missing token passes through; `RequireSession` rejects it later. A
/// token that fails verification is answered with 401, or 503 when the
/// provider is unreachable.
pub async fn auth_middleware(
    State(identity): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string);

    let Some(token) = token else {
        return next.run(request).await;
    };

    match identity.verify_session_token(&token).await {
        Ok(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(e) => {
            let (status, message) = match &e {
                IdentityError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
                IdentityError::Unavailable(msg) => {
                    tracing::error!(error = %msg, "Identity provider unavailable");
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Identity provider unavailable",
                    )
                }
                _ => (StatusCode::UNAUTHORIZED, "Invalid token"),
            };
            tracing::debug!(error = %e, "Rejected session token");

            (
                status,
                Json(serde_json::json!({
                    "success": false,
                    "message": message,
                    "code": "AUTH_ERROR"
                })),
            )
                .into_response()
        }
    }
}

/// Extractor for routes that need a verified session.
#[derive(Debug, Clone)]
pub struct RequireSession(pub VerifiedSession);

#[async_trait]
impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<VerifiedSession>()
            .cloned()
            .map(RequireSession)
            .ok_or(AuthRejection::Unauthenticated)
    }
}

#[derive(Debug, Clone)]
pub enum AuthRejection {
    Unauthenticated,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let message = match self {
            AuthRejection::Unauthenticated => "Authentication required",
        };

        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "success": false,
                "message": message,
                "code": "UNAUTHENTICATED"
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Timestamp, UserId};
    use axum::http::Request as HttpRequest;

    fn session() -> VerifiedSession {
        VerifiedSession {
            user_id: UserId::new("user-123").unwrap(),
            claims_snapshot: serde_json::json!({}),
            issued_at: Timestamp::now(),
            expires_at: Timestamp::now().plus_secs(60),
        }
    }

    #[tokio::test]
    async fn require_session_extracts_from_extensions() {
        let mut request: HttpRequest<()> = HttpRequest::builder().uri("/test").body(()).unwrap();
        request.extensions_mut().insert(session());
        let (mut parts, _body) = request.into_parts();

        let RequireSession(found) = RequireSession::from_request_parts(&mut parts, &())
            .await
            .unwrap();

        assert_eq!(found.user_id.as_str(), "user-123");
    }

    #[tokio::test]
    async fn require_session_rejects_without_session() {
        let request: HttpRequest<()> = HttpRequest::builder().uri("/test").body(()).unwrap();
        let (mut parts, _body) = request.into_parts();

        let result = RequireSession::from_request_parts(&mut parts, &()).await;

        assert!(matches!(result, Err(AuthRejection::Unauthenticated)));
    }

    #[test]
    fn rejection_is_unauthorized() {
        let response = AuthRejection::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
