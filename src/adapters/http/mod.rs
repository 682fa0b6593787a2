//! HTTP adapters - axum routes over the action dispatcher.

pub mod middleware;
pub mod workspace;

pub use workspace::{workspace_router, WorkspaceAppState};
