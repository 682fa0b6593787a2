//! CreateTenantHandler - Command handler for registering a partner workspace.

use std::sync::Arc;

use crate::application::{audit_trail, Authorizer};
use crate::domain::audit::{AuditAction, AuditRecord};
use crate::domain::foundation::{TenantId, Timestamp, UserId};
use crate::domain::membership::WorkspaceError;
use crate::domain::tenancy::Tenant;
use crate::ports::{AuditSink, TenantStore};

#[derive(Debug, Clone)]
pub struct CreateTenantCommand {
    pub actor_id: UserId,
    pub name: String,
    pub auth_namespace: String,
}

#[derive(Debug, Clone)]
pub struct CreateTenantResult {
    pub tenant: Tenant,
}

/// Creates tenants. Platform admins only.
pub struct CreateTenantHandler {
    tenants: Arc<dyn TenantStore>,
    audit: Arc<dyn AuditSink>,
    authorizer: Authorizer,
}

impl CreateTenantHandler {
    pub fn new(
        tenants: Arc<dyn TenantStore>,
        audit: Arc<dyn AuditSink>,
        authorizer: Authorizer,
    ) -> Self {
        Self {
            tenants,
            audit,
            authorizer,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateTenantCommand,
    ) -> Result<CreateTenantResult, WorkspaceError> {
        self.authorizer.require_platform_admin(&cmd.actor_id).await?;

        let now = Timestamp::now();
        let tenant = Tenant::create(
            TenantId::new(),
            cmd.name,
            &cmd.auth_namespace,
            cmd.actor_id.clone(),
            now,
        )?;

        // Duplicate namespaces surface as Conflict from the store.
        self.tenants.insert(&tenant).await?;

        tracing::info!(
            tenant_id = %tenant.id,
            auth_namespace = %tenant.auth_namespace,
            actor_id = %cmd.actor_id,
            "Tenant created"
        );
        audit_trail::emit(
            self.audit.as_ref(),
            AuditRecord::new(AuditAction::TenantCreated, cmd.actor_id, now)
                .tenant(tenant.id)
                .detail("auth_namespace", &tenant.auth_namespace),
        )
        .await;

        Ok(CreateTenantResult { tenant })
    }
}
