//! HTTP middleware for axum.
//!
//! - `auth` - Bearer session-token verification and extractors

pub mod auth;

pub use auth::{auth_middleware, AuthRejection, AuthState, RequireSession};
