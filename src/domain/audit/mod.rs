//! Audit records emitted by every state-changing operation.
//!
//! Records are append-only and never mutated once written.

use crate::domain::foundation::{AuditRecordId, TenantId, Timestamp, UserId, ValidationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    TenantCreated,
    TenantDeleted,
    InvitationCreated,
    InvitationAccepted,
    InvitationExpired,
    InvitationCancelled,
    MembershipInvited,
    MembershipActivated,
    MembershipSuspended,
    MembershipReactivated,
    MembershipDeleted,
    WorkspaceSwitched,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::TenantCreated => "tenant_created",
            AuditAction::TenantDeleted => "tenant_deleted",
            AuditAction::InvitationCreated => "invitation_created",
            AuditAction::InvitationAccepted => "invitation_accepted",
            AuditAction::InvitationExpired => "invitation_expired",
            AuditAction::InvitationCancelled => "invitation_cancelled",
            AuditAction::MembershipInvited => "membership_invited",
            AuditAction::MembershipActivated => "membership_activated",
            AuditAction::MembershipSuspended => "membership_suspended",
            AuditAction::MembershipReactivated => "membership_reactivated",
            AuditAction::MembershipDeleted => "membership_deleted",
            AuditAction::WorkspaceSwitched => "workspace_switched",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(|_| {
            ValidationError::invalid_format("audit_action", format!("unknown action '{}'", s))
        })
    }
}

/// Immutable audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: AuditRecordId,
    pub action: AuditAction,
    pub actor_id: UserId,
    pub target_user_id: Option<UserId>,
    pub tenant_id: Option<TenantId>,
    pub timestamp: Timestamp,
    pub details: BTreeMap<String, String>,
}

impl AuditRecord {
    pub fn new(action: AuditAction, actor_id: UserId, timestamp: Timestamp) -> Self {
        Self {
            id: AuditRecordId::new(),
            action,
            actor_id,
            target_user_id: None,
            tenant_id: None,
            timestamp,
            details: BTreeMap::new(),
        }
    }

    pub fn target(mut self, user_id: UserId) -> Self {
        self.target_user_id = Some(user_id);
        self
    }

    pub fn tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }
}
