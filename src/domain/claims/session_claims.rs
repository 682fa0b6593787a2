//! Session claims payload projected into the identity provider.

use crate::domain::foundation::TenantId;
use crate::domain::membership::{MembershipStatus, Permission, Role};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One workspace entry in the multi-workspace view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceClaim {
    pub tenant_id: TenantId,

    /// Tenant auth namespace.
    pub tenant: String,
    pub role: Role,
    pub status: MembershipStatus,
    pub permissions: BTreeSet<Permission>,
}

/// Which workspace is currently selected. Never represented by key absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ActiveTenant {
    #[default]
    None,
    Selected { tenant_id: TenantId },
}

impl ActiveTenant {
    pub fn tenant_id(&self) -> Option<TenantId> {
        match self {
            ActiveTenant::None => None,
            ActiveTenant::Selected { tenant_id } => Some(*tenant_id),
        }
    }
}

impl From<Option<TenantId>> for ActiveTenant {
    fn from(value: Option<TenantId>) -> Self {
        match value {
            Some(tenant_id) => ActiveTenant::Selected { tenant_id },
            None => ActiveTenant::None,
        }
    }
}

/// Single-workspace fields read by older clients.
///
/// Cleared fields serialize as explicit `null`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LegacyClaims {
    pub role: Option<Role>,
    pub tenant: Option<String>,
    pub partner_id: Option<TenantId>,
}

impl LegacyClaims {
    pub fn is_cleared(&self) -> bool {
        self.role.is_none() && self.tenant.is_none() && self.partner_id.is_none()
    }
}

/// The full claims payload for one user.
///
/// Always the output of [`super::derive_claims`]; nothing else writes it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionClaims {
    #[serde(flatten)]
    pub legacy: LegacyClaims,
    pub platform_role: Option<Role>,

    /// Sorted by tenant id.
    pub memberships: Vec<WorkspaceClaim>,

    /// Sorted, deduplicated.
    pub tenant_ids: Vec<TenantId>,
    pub active_tenant: ActiveTenant,
}

impl SessionClaims {
    /// Claims for a user with no memberships and no platform role.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn to_payload(&self) -> serde_json::Value {
        // Serializing plain data into a Value does not fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(payload)
    }

    /// Canonical byte encoding, stable for identical claims.
    pub fn to_canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn workspace(&self, tenant_id: TenantId) -> Option<&WorkspaceClaim> {
        self.memberships.iter().find(|m| m.tenant_id == tenant_id)
    }

    /// True if the user holds `permission` through an active membership in
    /// the tenant, or through a platform role.
    pub fn has_permission(&self, tenant_id: TenantId, permission: Permission) -> bool {
        if let Some(role) = self.platform_role {
            if role.default_permissions().contains(&permission) {
                return true;
            }
        }
        self.workspace(tenant_id)
            .filter(|w| w.status == MembershipStatus::Active)
            .is_some_and(|w| w.permissions.contains(&permission))
    }
}
