//! Workspace Access - multi-tenant membership and session-claims engine
//!
//! Users hold memberships in tenant workspaces. Invitations grant and
//! restore access, admins suspend and remove it, and every change is
//! reconciled into the claims payload the identity provider embeds in
//! session tokens.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
