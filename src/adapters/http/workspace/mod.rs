//! HTTP adapter for the workspace access engine.
//!
//! - `POST /v1/actions` - Dispatch a lifecycle action as the token's user
//! - `GET /v1/session` - Resolve the caller's session, healing stale claims
//! - `GET /health` - Liveness

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{WorkspaceApiError, WorkspaceAppState};
pub use routes::workspace_router;
