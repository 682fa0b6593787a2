//! HTTP handlers for the workspace endpoints.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::adapters::http::middleware::RequireSession;
use crate::application::{ActionDispatcher, ActionResponse};
use crate::domain::membership::WorkspaceError;
use crate::ports::{IdentityProvider, VerifiedSession};

use super::dto::{ActionBody, HealthResponse, SessionResponse};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct WorkspaceAppState {
    pub dispatcher: Arc<ActionDispatcher>,
    pub identity: Arc<dyn IdentityProvider>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /v1/actions
///
/// After the action runs, the caller's stored claims are checked against
/// the store and healed, and the body reports whether the presented token
/// is now stale.
pub async fn dispatch_action(
    State(state): State<WorkspaceAppState>,
    RequireSession(session): RequireSession,
    Json(body): Json<ActionBody>,
) -> Result<Json<ActionResponse>, WorkspaceApiError> {
    let request = body.into_request(session.user_id.clone());
    tracing::debug!(user_id = %request.actor_user_id, action = ?request.action, "Dispatching action");

    let outcome = state.dispatcher.execute(request).await;
    let refresh_required = heal_session(&state, &session).await;

    Ok(Json(outcome?.with_refresh_required(refresh_required)))
}

/// Self-heal for the action path. A failure here never fails the action.
async fn heal_session(state: &WorkspaceAppState, session: &VerifiedSession) -> Option<bool> {
    match state.dispatcher.reconciler().resolve_verified(session).await {
        Ok(resolved) => Some(resolved.refresh_required),
        Err(e) => {
            tracing::warn!(user_id = %session.user_id, error = %e, "Session check after action failed");
            None
        }
    }
}

/// GET /v1/session
pub async fn resolve_session(
    State(state): State<WorkspaceAppState>,
    RequireSession(session): RequireSession,
) -> Result<Json<SessionResponse>, WorkspaceApiError> {
    let resolved = state.dispatcher.reconciler().resolve_verified(&session).await?;
    Ok(Json(resolved.into()))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Converts a `WorkspaceError` into a status code and failure body.
#[derive(Debug)]
pub struct WorkspaceApiError(pub WorkspaceError);

impl From<WorkspaceError> for WorkspaceApiError {
    fn from(err: WorkspaceError) -> Self {
        Self(err)
    }
}

impl WorkspaceApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            WorkspaceError::PermissionDenied(_) | WorkspaceError::AccessDenied(_) => {
                StatusCode::FORBIDDEN
            }
            WorkspaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            WorkspaceError::Conflict(_) | WorkspaceError::InvitationInvalid(_) => {
                StatusCode::CONFLICT
            }
            WorkspaceError::InvitationExpired(_) => StatusCode::GONE,
            WorkspaceError::ContactMismatch | WorkspaceError::Validation { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            WorkspaceError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for WorkspaceApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed upstream");
        }
        (status, Json(ActionResponse::failure(&self.0))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::membership::ResourceKind;

    fn status_of(err: WorkspaceError) -> StatusCode {
        WorkspaceApiError(err).status()
    }

    #[test]
    fn maps_errors_to_statuses() {
        assert_eq!(status_of(WorkspaceError::permission_denied("x")), StatusCode::FORBIDDEN);
        assert_eq!(status_of(WorkspaceError::access_denied("x")), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(WorkspaceError::not_found(ResourceKind::Tenant, "t")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(WorkspaceError::conflict("x")), StatusCode::CONFLICT);
        assert_eq!(status_of(WorkspaceError::invitation_expired("ABC")), StatusCode::GONE);
        assert_eq!(
            status_of(WorkspaceError::ContactMismatch),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(WorkspaceError::validation("payload", "bad")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(WorkspaceError::upstream("down")),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
