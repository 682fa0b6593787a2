//! Read-side query handlers.

use std::sync::Arc;

use serde::Serialize;

use crate::application::Authorizer;
use crate::domain::audit::AuditRecord;
use crate::domain::claims::select_active_tenant;
use crate::domain::foundation::{TenantId, UserId};
use crate::domain::invitation::Invitation;
use crate::domain::membership::{Membership, MembershipStatus, Role, WorkspaceError};
use crate::ports::{AuditSink, InvitationStore, MembershipStore, TenantStore};

// ════════════════════════════════════════════════════════════════════════════
// ListWorkspaces
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct ListWorkspacesQuery {
    pub user_id: UserId,
}

/// One tenant the user belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceEntry {
    pub tenant_id: TenantId,
    pub name: String,
    pub auth_namespace: String,
    pub role: Role,
    pub status: MembershipStatus,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListWorkspacesResult {
    pub workspaces: Vec<WorkspaceEntry>,
    pub active_tenant: Option<TenantId>,
}

pub struct ListWorkspacesHandler {
    memberships: Arc<dyn MembershipStore>,
    tenants: Arc<dyn TenantStore>,
}

impl ListWorkspacesHandler {
    pub fn new(memberships: Arc<dyn MembershipStore>, tenants: Arc<dyn TenantStore>) -> Self {
        Self {
            memberships,
            tenants,
        }
    }

    /// Lists the caller's own workspaces, suspended ones included.
    pub async fn handle(
        &self,
        query: ListWorkspacesQuery,
    ) -> Result<ListWorkspacesResult, WorkspaceError> {
        let memberships = self.memberships.list_by_user(&query.user_id).await?;
        let preferred = self.memberships.get_active_tenant(&query.user_id).await?;
        let active_tenant = select_active_tenant(&memberships, preferred);

        let mut workspaces = Vec::with_capacity(memberships.len());
        for m in memberships {
            // Skip rows whose tenant vanished mid-delete.
            let Some(tenant) = self.tenants.find(m.tenant_id).await? else {
                continue;
            };
            workspaces.push(WorkspaceEntry {
                tenant_id: m.tenant_id,
                name: tenant.name,
                auth_namespace: tenant.auth_namespace,
                role: m.role,
                status: m.status,
                is_active: active_tenant == Some(m.tenant_id),
            });
        }
        workspaces.sort_by_key(|w| w.tenant_id);

        Ok(ListWorkspacesResult {
            workspaces,
            active_tenant,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ListTenantMembers
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct ListTenantMembersQuery {
    pub actor_id: UserId,
    pub tenant_id: TenantId,
}

pub struct ListTenantMembersHandler {
    memberships: Arc<dyn MembershipStore>,
    invitations: Arc<dyn InvitationStore>,
    audit: Arc<dyn AuditSink>,
    authorizer: Authorizer,
}

#[derive(Debug, Clone)]
pub struct ListTenantMembersResult {
    pub members: Vec<Membership>,
    pub invitations: Vec<Invitation>,
}

impl ListTenantMembersHandler {
    pub fn new(
        memberships: Arc<dyn MembershipStore>,
        invitations: Arc<dyn InvitationStore>,
        audit: Arc<dyn AuditSink>,
        authorizer: Authorizer,
    ) -> Self {
        Self {
            memberships,
            invitations,
            audit,
            authorizer,
        }
    }

    /// Members ordered by join time, plus the tenant's invitations.
    pub async fn handle(
        &self,
        query: ListTenantMembersQuery,
    ) -> Result<ListTenantMembersResult, WorkspaceError> {
        self.authorizer
            .require_tenant_admin(&query.actor_id, query.tenant_id)
            .await?;

        let mut members = self.memberships.list_by_tenant(query.tenant_id).await?;
        members.sort_by(|a, b| {
            a.joined_at
                .cmp(&b.joined_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        let mut invitations = self.invitations.list_by_tenant(query.tenant_id).await?;
        invitations.sort_by_key(|i| std::cmp::Reverse(i.created_at));

        Ok(ListTenantMembersResult {
            members,
            invitations,
        })
    }

    /// Audit trail of the tenant, oldest first.
    pub async fn audit_trail(
        &self,
        query: ListTenantMembersQuery,
    ) -> Result<Vec<AuditRecord>, WorkspaceError> {
        self.authorizer
            .require_tenant_admin(&query.actor_id, query.tenant_id)
            .await?;
        Ok(self.audit.list_for_tenant(query.tenant_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::test_support::World;
    use crate::domain::foundation::Timestamp;

    #[tokio::test]
    async fn workspaces_include_suspended_and_flag_active() {
        let world = World::new();
        let (a, b) = (world.tenant("acme").await, world.tenant("globex").await);
        let jane = world.user("jane", None).await;
        world.member(&jane, a, Role::Employee).await;
        let mut m = world.member(&jane, b, Role::Employee).await;
        m.suspend(UserId::new("root").unwrap(), None, Timestamp::now()).unwrap();
        world.memberships.upsert(&m).await.unwrap();

        let handler = ListWorkspacesHandler::new(world.memberships.clone(), world.tenants.clone());
        let result = handler
            .handle(ListWorkspacesQuery { user_id: jane })
            .await
            .unwrap();

        assert_eq!(result.workspaces.len(), 2);
        assert_eq!(result.active_tenant, Some(a));
        let active: Vec<_> = result.workspaces.iter().filter(|w| w.is_active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].auth_namespace, "acme");
    }

    #[tokio::test]
    async fn members_listing_requires_tenant_admin() {
        let world = World::new();
        let a = world.tenant("acme").await;
        let pa = world.user("pa", None).await;
        let emp = world.user("emp", None).await;
        world.member(&pa, a, Role::PartnerAdmin).await;
        world.member(&emp, a, Role::Employee).await;

        let handler = ListTenantMembersHandler::new(
            world.memberships.clone(),
            world.invitations.clone(),
            world.audit.clone(),
            world.authorizer.clone(),
        );

        let result = handler
            .handle(ListTenantMembersQuery {
                actor_id: pa,
                tenant_id: a,
            })
            .await
            .unwrap();
        assert_eq!(result.members.len(), 2);

        let err = handler
            .handle(ListTenantMembersQuery {
                actor_id: emp,
                tenant_id: a,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::PermissionDenied(_)));
    }
}
