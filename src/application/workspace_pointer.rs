//! Maintenance of the stored active-workspace preference.
//!
//! The preference may only ever name a tenant where the user is active.
//! Operations that remove access heal it; operations that grant access
//! fill it when the user has no usable workspace.

use crate::domain::claims::select_active_tenant;
use crate::domain::foundation::{TenantId, UserId};
use crate::domain::membership::WorkspaceError;
use crate::ports::MembershipStore;

/// Points the user at `granted` if no other active workspace is usable.
pub async fn adopt_if_unset(
    store: &dyn MembershipStore,
    user_id: &UserId,
    granted: TenantId,
) -> Result<(), WorkspaceError> {
    let preferred = store.get_active_tenant(user_id).await?;
    let others: Vec<_> = store
        .list_by_user(user_id)
        .await?
        .into_iter()
        .filter(|m| m.tenant_id != granted)
        .collect();

    if select_active_tenant(&others, preferred).is_none() {
        store.set_active_tenant(user_id, Some(granted)).await?;
        tracing::debug!(user_id = %user_id, tenant_id = %granted, "Active workspace adopted");
    }
    Ok(())
}

/// Re-points or clears the preference after the user lost access somewhere.
///
/// Returns the tenant the user now lands in.
pub async fn heal(
    store: &dyn MembershipStore,
    user_id: &UserId,
) -> Result<Option<TenantId>, WorkspaceError> {
    let preferred = store.get_active_tenant(user_id).await?;
    let memberships = store.list_by_user(user_id).await?;
    let effective = select_active_tenant(&memberships, preferred);

    if effective != preferred {
        store.set_active_tenant(user_id, effective).await?;
        tracing::debug!(
            user_id = %user_id,
            from = ?preferred,
            to = ?effective,
            "Active workspace re-pointed"
        );
    }
    Ok(effective)
}
