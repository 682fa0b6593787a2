//! Pure derivation of session claims from membership state.

use crate::domain::foundation::TenantId;
use crate::domain::membership::{Membership, Role};
use std::collections::{BTreeMap, BTreeSet};

use super::{ActiveTenant, LegacyClaims, SessionClaims, WorkspaceClaim};

/// Store state that claims are derived from.
#[derive(Debug, Clone, Copy)]
pub struct ClaimsSource<'a> {
    pub platform_role: Option<Role>,

    /// All of the user's memberships. Suspended ones are ignored.
    pub memberships: &'a [Membership],

    /// Tenant id to auth namespace.
    pub namespaces: &'a BTreeMap<TenantId, String>,

    /// The user's stored active-workspace selection.
    pub preferred_tenant: Option<TenantId>,
}

/// Picks the active tenant.
///
/// The preferred tenant wins while its membership is active. Otherwise the
/// active membership with the earliest `joined_at` wins, ties broken by
/// tenant id. With no active membership there is no active tenant.
pub fn select_active_tenant(
    memberships: &[Membership],
    preferred: Option<TenantId>,
) -> Option<TenantId> {
    let active = memberships.iter().filter(|m| m.is_active());

    if let Some(preferred) = preferred {
        if active.clone().any(|m| m.tenant_id == preferred) {
            return Some(preferred);
        }
    }

    active
        .min_by_key(|m| (m.joined_at, m.tenant_id))
        .map(|m| m.tenant_id)
}

/// Derives the complete claims payload.
///
/// The output depends only on the input set, never on its order.
pub fn derive_claims(source: ClaimsSource<'_>) -> SessionClaims {
    let mut memberships: Vec<WorkspaceClaim> = source
        .memberships
        .iter()
        .filter(|m| m.status.is_visible_in_claims())
        .map(|m| WorkspaceClaim {
            tenant_id: m.tenant_id,
            tenant: namespace_for(source.namespaces, m.tenant_id),
            role: m.role,
            status: m.status,
            permissions: m.permissions.clone(),
        })
        .collect();
    memberships.sort_by_key(|w| w.tenant_id);

    let tenant_ids: Vec<TenantId> = memberships
        .iter()
        .map(|w| w.tenant_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let active = select_active_tenant(source.memberships, source.preferred_tenant);

    let legacy = active
        .and_then(|tenant_id| {
            source
                .memberships
                .iter()
                .find(|m| m.tenant_id == tenant_id)
        })
        .map(|m| LegacyClaims {
            role: Some(m.role),
            tenant: Some(namespace_for(source.namespaces, m.tenant_id)),
            partner_id: Some(m.tenant_id),
        })
        .unwrap_or_default();

    SessionClaims {
        legacy,
        platform_role: source.platform_role,
        memberships,
        tenant_ids,
        active_tenant: ActiveTenant::from(active),
    }
}

fn namespace_for(namespaces: &BTreeMap<TenantId, String>, tenant_id: TenantId) -> String {
    namespaces
        .get(&tenant_id)
        .cloned()
        .unwrap_or_else(|| tenant_id.to_string())
}
