//! Request and response bodies for the workspace endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::application::{ActionKind, ActionRequest, ResolvedSession};
use crate::domain::claims::SessionClaims;
use crate::domain::foundation::{TenantId, UserId};

/// Body of `POST /v1/actions`. The actor is taken from the session.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionBody {
    pub action: ActionKind,
    #[serde(default)]
    pub target_tenant_id: Option<TenantId>,
    #[serde(default)]
    pub target_user_id: Option<UserId>,
    #[serde(default)]
    pub payload: Value,
}

impl ActionBody {
    pub fn into_request(self, actor_user_id: UserId) -> ActionRequest {
        ActionRequest {
            actor_user_id,
            action: self.action,
            target_tenant_id: self.target_tenant_id,
            target_user_id: self.target_user_id,
            payload: self.payload,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub user_id: UserId,
    pub claims: SessionClaims,
    pub refresh_required: bool,
    pub healed: bool,
}

impl From<ResolvedSession> for SessionResponse {
    fn from(resolved: ResolvedSession) -> Self {
        Self {
            user_id: resolved.user_id,
            claims: resolved.claims,
            refresh_required: resolved.refresh_required,
            healed: resolved.healed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
