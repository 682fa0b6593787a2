//! Axum router for the workspace endpoints.

use std::time::Duration;

use axum::http::HeaderValue;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{dispatch_action, health, resolve_session, WorkspaceAppState};
use crate::adapters::http::middleware::auth_middleware;

/// Routes behind session-token verification.
///
/// - `POST /actions`
/// - `GET /session`
pub fn session_routes(state: &WorkspaceAppState) -> Router<WorkspaceAppState> {
    Router::new()
        .route("/actions", post(dispatch_action))
        .route("/session", get(resolve_session))
        .layer(middleware::from_fn_with_state(
            state.identity.clone(),
            auth_middleware,
        ))
}

/// Full router with tracing, request ids, timeout and CORS.
///
/// An empty origin list allows any origin.
pub fn workspace_router(
    state: WorkspaceAppState,
    request_timeout: Duration,
    cors_origins: &[String],
) -> Router {
    let cors = if cors_origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = cors_origins
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(origins))
    }
    .allow_methods(Any)
    .allow_headers(Any);

    Router::new()
        .nest("/v1", session_routes(&state))
        .route("/health", get(health))
        .with_state(state)
        // Outermost first: the request id exists before the trace span opens.
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors)
                .layer(TimeoutLayer::new(request_timeout)),
        )
}
