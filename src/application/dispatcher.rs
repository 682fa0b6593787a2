//! Action dispatcher - the single entry point for presentation-layer requests.
//!
//! A request names an action, the acting user, optional target tenant and
//! user, and an action-specific JSON payload. The dispatcher routes it to the
//! matching handler and shapes the outcome as an [`ActionResponse`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::application::handlers::*;
use crate::application::{Authorizer, ClaimsReconciler, InvitationValidator, RetryPolicy};
use crate::domain::foundation::{Contact, ErrorCode, InvitationId, TenantId, UserId};
use crate::domain::membership::{Role, WorkspaceError};
use crate::ports::{
    AuditSink, IdentityProvider, InvitationStore, MembershipStore, TenantStore, UserDirectory,
};

/// Named lifecycle actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    RegisterUser,
    CreateTenant,
    DeleteTenant,
    InviteMember,
    AcceptInvitation,
    CancelInvitation,
    SwitchWorkspace,
    DeactivateMember,
    ReactivateMember,
    DeleteMembership,
    ListWorkspaces,
    ListMembers,
    AuditTrail,
    RefreshClaims,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub actor_user_id: UserId,
    pub action: ActionKind,
    #[serde(default)]
    pub target_tenant_id: Option<TenantId>,
    #[serde(default)]
    pub target_user_id: Option<UserId>,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,

    /// Stable error code on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Set by the HTTP layer when the presented token no longer matches
    /// the claims derived from the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_required: Option<bool>,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            code: None,
            data: Some(data),
            refresh_required: None,
        }
    }

    pub fn failure(err: &WorkspaceError) -> Self {
        Self {
            success: false,
            message: err.message(),
            code: Some(err.code()),
            data: None,
            refresh_required: None,
        }
    }

    pub fn with_refresh_required(mut self, refresh_required: Option<bool>) -> Self {
        self.refresh_required = refresh_required;
        self
    }
}

// === Payloads ===

#[derive(Debug, Deserialize)]
struct RegisterUserPayload {
    display_name: String,
    contacts: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CreateTenantPayload {
    name: String,
    auth_namespace: String,
}

#[derive(Debug, Deserialize)]
struct InviteMemberPayload {
    contact: String,
    role: Role,
}

#[derive(Debug, Deserialize)]
struct AcceptInvitationPayload {
    /// Code or invitation id.
    code: String,
    #[serde(default)]
    contact: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CancelInvitationPayload {
    invitation_id: InvitationId,
}

#[derive(Debug, Default, Deserialize)]
struct DeactivateMemberPayload {
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReactivateMemberPayload {
    invitation: String,
}

/// Everything the dispatcher wires its handlers from.
#[derive(Clone)]
pub struct Dependencies {
    pub memberships: Arc<dyn MembershipStore>,
    pub invitations: Arc<dyn InvitationStore>,
    pub tenants: Arc<dyn TenantStore>,
    pub users: Arc<dyn UserDirectory>,
    pub audit: Arc<dyn AuditSink>,
    pub identity: Arc<dyn IdentityProvider>,
    pub invitation_policy: InvitationPolicy,
    pub retry_policy: RetryPolicy,
}

pub struct ActionDispatcher {
    reconciler: Arc<ClaimsReconciler>,
    register_user: RegisterUserHandler,
    create_tenant: CreateTenantHandler,
    delete_tenant: DeleteTenantHandler,
    invite_member: InviteMemberHandler,
    accept_invitation: AcceptInvitationHandler,
    cancel_invitation: CancelInvitationHandler,
    switch_workspace: SwitchWorkspaceHandler,
    deactivate_member: DeactivateMemberHandler,
    reactivate_member: ReactivateMemberHandler,
    delete_membership: DeleteMembershipHandler,
    list_workspaces: ListWorkspacesHandler,
    list_members: ListTenantMembersHandler,
    expire_invitations: ExpireInvitationsHandler,
}

impl ActionDispatcher {
    pub fn new(deps: Dependencies) -> Self {
        let reconciler = Arc::new(ClaimsReconciler::new(
            deps.memberships.clone(),
            deps.tenants.clone(),
            deps.users.clone(),
            deps.identity.clone(),
            deps.retry_policy.clone(),
        ));
        let authorizer = Authorizer::new(deps.users.clone(), deps.memberships.clone());
        let validator = Arc::new(InvitationValidator::new(
            deps.invitations.clone(),
            deps.memberships.clone(),
            deps.users.clone(),
            deps.audit.clone(),
        ));

        Self {
            register_user: RegisterUserHandler::new(deps.users.clone(), reconciler.clone()),
            create_tenant: CreateTenantHandler::new(
                deps.tenants.clone(),
                deps.audit.clone(),
                authorizer.clone(),
            ),
            delete_tenant: DeleteTenantHandler::new(
                deps.tenants.clone(),
                deps.memberships.clone(),
                deps.invitations.clone(),
                deps.audit.clone(),
                authorizer.clone(),
                reconciler.clone(),
            ),
            invite_member: InviteMemberHandler::new(
                deps.tenants.clone(),
                deps.invitations.clone(),
                deps.memberships.clone(),
                deps.users.clone(),
                deps.audit.clone(),
                authorizer.clone(),
                reconciler.clone(),
                deps.invitation_policy.clone(),
            ),
            accept_invitation: AcceptInvitationHandler::new(
                deps.memberships.clone(),
                deps.users.clone(),
                deps.audit.clone(),
                validator.clone(),
                reconciler.clone(),
            ),
            cancel_invitation: CancelInvitationHandler::new(
                deps.invitations.clone(),
                deps.memberships.clone(),
                deps.users.clone(),
                deps.audit.clone(),
                authorizer.clone(),
                reconciler.clone(),
            ),
            switch_workspace: SwitchWorkspaceHandler::new(
                deps.memberships.clone(),
                deps.audit.clone(),
                reconciler.clone(),
            ),
            deactivate_member: DeactivateMemberHandler::new(
                deps.memberships.clone(),
                deps.audit.clone(),
                authorizer.clone(),
                reconciler.clone(),
            ),
            reactivate_member: ReactivateMemberHandler::new(
                deps.memberships.clone(),
                deps.users.clone(),
                deps.audit.clone(),
                authorizer.clone(),
                validator,
                reconciler.clone(),
            ),
            delete_membership: DeleteMembershipHandler::new(
                deps.memberships.clone(),
                deps.audit.clone(),
                authorizer.clone(),
                reconciler.clone(),
            ),
            list_workspaces: ListWorkspacesHandler::new(
                deps.memberships.clone(),
                deps.tenants.clone(),
            ),
            list_members: ListTenantMembersHandler::new(
                deps.memberships.clone(),
                deps.invitations.clone(),
                deps.audit.clone(),
                authorizer,
            ),
            expire_invitations: ExpireInvitationsHandler::new(deps.invitations, deps.audit),
            reconciler,
        }
    }

    pub fn reconciler(&self) -> &Arc<ClaimsReconciler> {
        &self.reconciler
    }

    pub fn expiry_sweep(&self) -> &ExpireInvitationsHandler {
        &self.expire_invitations
    }

    /// Runs the request and shapes the outcome. Never fails.
    pub async fn dispatch(&self, request: ActionRequest) -> ActionResponse {
        let action = request.action;
        match self.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                if err.is_retryable() {
                    tracing::warn!(action = ?action, error = %err, "Action failed upstream");
                } else {
                    tracing::debug!(action = ?action, error = %err, "Action rejected");
                }
                ActionResponse::failure(&err)
            }
        }
    }

    /// Runs the request, keeping the typed error for callers that map it.
    pub async fn execute(&self, request: ActionRequest) -> Result<ActionResponse, WorkspaceError> {
        let actor = request.actor_user_id.clone();
        tracing::debug!(actor_id = %actor, action = ?request.action, "Dispatching action");

        match request.action {
            ActionKind::RegisterUser => {
                let payload: RegisterUserPayload = parse_payload(request.payload)?;
                let contacts = payload
                    .contacts
                    .iter()
                    .map(|c| c.parse::<Contact>())
                    .collect::<Result<Vec<_>, _>>()?;
                let result = self
                    .register_user
                    .handle(RegisterUserCommand {
                        user_id: actor,
                        display_name: payload.display_name,
                        contacts,
                    })
                    .await?;
                Ok(ActionResponse::ok(
                    "User registered",
                    json!({ "user": result.user, "created": result.created }),
                ))
            }

            ActionKind::CreateTenant => {
                let payload: CreateTenantPayload = parse_payload(request.payload)?;
                let result = self
                    .create_tenant
                    .handle(CreateTenantCommand {
                        actor_id: actor,
                        name: payload.name,
                        auth_namespace: payload.auth_namespace,
                    })
                    .await?;
                Ok(ActionResponse::ok("Tenant created", json!({ "tenant": result.tenant })))
            }

            ActionKind::DeleteTenant => {
                let tenant_id = require_tenant(request.target_tenant_id)?;
                let result = self
                    .delete_tenant
                    .handle(DeleteTenantCommand {
                        actor_id: actor,
                        tenant_id,
                    })
                    .await?;
                Ok(ActionResponse::ok(
                    "Tenant deleted",
                    json!({
                        "removed_memberships": result.removed_memberships,
                        "removed_invitations": result.removed_invitations,
                    }),
                ))
            }

            ActionKind::InviteMember => {
                let tenant_id = require_tenant(request.target_tenant_id)?;
                let payload: InviteMemberPayload = parse_payload(request.payload)?;
                let result = self
                    .invite_member
                    .handle(InviteMemberCommand {
                        actor_id: actor,
                        tenant_id,
                        contact: payload.contact.parse()?,
                        role: payload.role,
                    })
                    .await?;
                Ok(ActionResponse::ok(
                    "Invitation created",
                    json!({
                        "invitation_id": result.invitation.id,
                        "code": result.invitation.code,
                        "expires_at": result.invitation.expires_at,
                        "pre_provisioned": result.provisioned.is_some(),
                    }),
                ))
            }

            ActionKind::AcceptInvitation => {
                let payload: AcceptInvitationPayload = parse_payload(request.payload)?;
                let contact = payload.contact.map(|c| c.parse::<Contact>()).transpose()?;
                let result = self
                    .accept_invitation
                    .handle(AcceptInvitationCommand {
                        user_id: actor,
                        reference: payload.code,
                        contact,
                    })
                    .await?;
                Ok(ActionResponse::ok(
                    "Invitation accepted",
                    json!({
                        "membership": result.membership,
                        "reactivated": matches!(
                            result.decision,
                            crate::domain::invitation::InvitationDecision::Reactivation { .. }
                        ),
                        "claims": result.claims,
                    }),
                ))
            }

            ActionKind::CancelInvitation => {
                let payload: CancelInvitationPayload = parse_payload(request.payload)?;
                let result = self
                    .cancel_invitation
                    .handle(CancelInvitationCommand {
                        actor_id: actor,
                        invitation_id: payload.invitation_id,
                    })
                    .await?;
                Ok(ActionResponse::ok(
                    "Invitation cancelled",
                    json!({
                        "invitation": result.invitation,
                        "withdrawn_for": result.withdrawn_for,
                    }),
                ))
            }

            ActionKind::SwitchWorkspace => {
                let tenant_id = require_tenant(request.target_tenant_id)?;
                let result = self
                    .switch_workspace
                    .handle(SwitchWorkspaceCommand {
                        user_id: actor,
                        tenant_id,
                    })
                    .await?;
                Ok(ActionResponse::ok(
                    "Workspace switched",
                    json!({ "membership": result.membership, "claims": result.claims }),
                ))
            }

            ActionKind::DeactivateMember => {
                let tenant_id = require_tenant(request.target_tenant_id)?;
                let target_user_id = require_user(request.target_user_id)?;
                let payload: DeactivateMemberPayload = if request.payload.is_null() {
                    DeactivateMemberPayload::default()
                } else {
                    parse_payload(request.payload)?
                };
                let result = self
                    .deactivate_member
                    .handle(DeactivateMemberCommand {
                        actor_id: actor,
                        tenant_id,
                        target_user_id,
                        reason: payload.reason,
                    })
                    .await?;
                let message = if result.changed {
                    "Member deactivated"
                } else {
                    "Member already deactivated"
                };
                Ok(ActionResponse::ok(
                    message,
                    json!({
                        "membership": result.membership,
                        "active_tenant": result.active_tenant,
                    }),
                ))
            }

            ActionKind::ReactivateMember => {
                let tenant_id = require_tenant(request.target_tenant_id)?;
                let target_user_id = require_user(request.target_user_id)?;
                let payload: ReactivateMemberPayload = parse_payload(request.payload)?;
                let result = self
                    .reactivate_member
                    .handle(ReactivateMemberCommand {
                        actor_id: actor,
                        tenant_id,
                        target_user_id,
                        invitation: payload.invitation,
                    })
                    .await?;
                Ok(ActionResponse::ok(
                    "Member reactivated",
                    json!({ "membership": result.membership }),
                ))
            }

            ActionKind::DeleteMembership => {
                let tenant_id = require_tenant(request.target_tenant_id)?;
                let target_user_id = require_user(request.target_user_id)?;
                let result = self
                    .delete_membership
                    .handle(DeleteMembershipCommand {
                        actor_id: actor,
                        tenant_id,
                        target_user_id,
                    })
                    .await?;
                Ok(ActionResponse::ok(
                    "Membership deleted",
                    json!({ "active_tenant": result.active_tenant }),
                ))
            }

            ActionKind::ListWorkspaces => {
                let result = self
                    .list_workspaces
                    .handle(ListWorkspacesQuery { user_id: actor })
                    .await?;
                Ok(ActionResponse::ok("Workspaces", json!(result)))
            }

            ActionKind::ListMembers => {
                let tenant_id = require_tenant(request.target_tenant_id)?;
                let result = self
                    .list_members
                    .handle(ListTenantMembersQuery {
                        actor_id: actor,
                        tenant_id,
                    })
                    .await?;
                Ok(ActionResponse::ok(
                    "Members",
                    json!({ "members": result.members, "invitations": result.invitations }),
                ))
            }

            ActionKind::AuditTrail => {
                let tenant_id = require_tenant(request.target_tenant_id)?;
                let records = self
                    .list_members
                    .audit_trail(ListTenantMembersQuery {
                        actor_id: actor,
                        tenant_id,
                    })
                    .await?;
                Ok(ActionResponse::ok("Audit trail", json!({ "records": records })))
            }

            ActionKind::RefreshClaims => {
                let claims = self.reconciler.reconcile(&actor).await?;
                Ok(ActionResponse::ok("Claims refreshed", json!({ "claims": claims })))
            }
        }
    }
}

fn parse_payload<T: DeserializeOwned>(payload: Value) -> Result<T, WorkspaceError> {
    serde_json::from_value(payload).map_err(|e| WorkspaceError::validation("payload", e.to_string()))
}

fn require_tenant(tenant_id: Option<TenantId>) -> Result<TenantId, WorkspaceError> {
    tenant_id.ok_or_else(|| WorkspaceError::validation("target_tenant_id", "required for this action"))
}

fn require_user(user_id: Option<UserId>) -> Result<UserId, WorkspaceError> {
    user_id.ok_or_else(|| WorkspaceError::validation("target_user_id", "required for this action"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::identity::LocalIdentityProvider;
    use crate::adapters::memory::{
        InMemoryAuditLog, InMemoryInvitationStore, InMemoryMembershipStore, InMemoryTenantStore,
        InMemoryUserDirectory,
    };
    use crate::domain::tenancy::User;
    use secrecy::SecretString;

    async fn dispatcher() -> (ActionDispatcher, UserId) {
        let users = Arc::new(InMemoryUserDirectory::new());
        let root = UserId::new("root").unwrap();
        users
            .upsert(
                &User::new(root.clone(), "Root", vec![Contact::email("root@example.com").unwrap()])
                    .unwrap()
                    .with_platform_role(Role::SuperAdmin),
            )
            .await
            .unwrap();

        let deps = Dependencies {
            memberships: Arc::new(InMemoryMembershipStore::new()),
            invitations: Arc::new(InMemoryInvitationStore::new()),
            tenants: Arc::new(InMemoryTenantStore::new()),
            users,
            audit: Arc::new(InMemoryAuditLog::new()),
            identity: Arc::new(LocalIdentityProvider::new(
                "dispatcher-tests",
                &SecretString::new("dispatcher-test-secret-0123456789".to_string()),
                600,
            )),
            invitation_policy: InvitationPolicy::default(),
            retry_policy: RetryPolicy::default(),
        };
        (ActionDispatcher::new(deps), root)
    }

    fn request(actor: &UserId, action: ActionKind, payload: Value) -> ActionRequest {
        ActionRequest {
            actor_user_id: actor.clone(),
            action,
            target_tenant_id: None,
            target_user_id: None,
            payload,
        }
    }

    #[test]
    fn request_parses_from_wire_json() {
        let req: ActionRequest = serde_json::from_value(json!({
            "actor_user_id": "u-1",
            "action": "accept_invitation",
            "payload": { "code": "abc123de" }
        }))
        .unwrap();
        assert_eq!(req.action, ActionKind::AcceptInvitation);
        assert!(req.target_tenant_id.is_none());
    }

    #[tokio::test]
    async fn create_then_invite_round_trip() {
        let (d, root) = dispatcher().await;

        let created = d
            .dispatch(request(
                &root,
                ActionKind::CreateTenant,
                json!({ "name": "Acme", "auth_namespace": "acme" }),
            ))
            .await;
        assert!(created.success, "{}", created.message);
        let tenant_id: TenantId =
            serde_json::from_value(created.data.unwrap()["tenant"]["id"].clone()).unwrap();

        let mut invite = request(
            &root,
            ActionKind::InviteMember,
            json!({ "contact": "+1 (555) 123-4567", "role": "employee" }),
        );
        invite.target_tenant_id = Some(tenant_id);
        let invited = d.dispatch(invite).await;
        assert!(invited.success, "{}", invited.message);
        let code = invited.data.unwrap()["code"].as_str().unwrap().to_string();
        assert_eq!(code.len(), 8);
    }

    #[tokio::test]
    async fn missing_tenant_is_a_validation_failure() {
        let (d, root) = dispatcher().await;
        let response = d.dispatch(request(&root, ActionKind::DeleteTenant, Value::Null)).await;

        assert!(!response.success);
        assert_eq!(response.code, Some(ErrorCode::ValidationFailed));
    }

    #[tokio::test]
    async fn malformed_payload_is_a_validation_failure() {
        let (d, root) = dispatcher().await;
        let response = d
            .dispatch(request(&root, ActionKind::CreateTenant, json!({ "name": 7 })))
            .await;
        assert_eq!(response.code, Some(ErrorCode::ValidationFailed));
    }

    #[tokio::test]
    async fn refresh_claims_writes_payload() {
        let (d, root) = dispatcher().await;
        let response = d
            .dispatch(request(&root, ActionKind::RefreshClaims, Value::Null))
            .await;
        assert!(response.success);
        assert_eq!(response.data.unwrap()["claims"]["platform_role"], "super_admin");
    }
}
