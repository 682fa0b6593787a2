//! Workspace access error types.
//!
//! Errors surfaced by every lifecycle operation. Business errors carry a
//! stable message; only `UpstreamUnavailable` is retryable.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | PermissionDenied | 403 |
//! | AccessDenied | 403 |
//! | NotFound | 404 |
//! | Conflict | 409 |
//! | InvitationInvalid | 409 |
//! | InvitationExpired | 410 |
//! | ContactMismatch | 422 |
//! | Validation | 422 |
//! | UpstreamUnavailable | 503 |

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};
use std::fmt;

/// Kind of entity a `NotFound` error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Tenant,
    User,
    Membership,
    Invitation,
}

impl ResourceKind {
    fn code(&self) -> ErrorCode {
        match self {
            ResourceKind::Tenant => ErrorCode::TenantNotFound,
            ResourceKind::User => ErrorCode::UserNotFound,
            ResourceKind::Membership => ErrorCode::MembershipNotFound,
            ResourceKind::Invitation => ErrorCode::InvitationNotFound,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceKind::Tenant => "Tenant",
            ResourceKind::User => "User",
            ResourceKind::Membership => "Membership",
            ResourceKind::Invitation => "Invitation",
        };
        write!(f, "{}", s)
    }
}

/// Errors returned by workspace membership operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
    /// Caller lacks the role required for the tenant.
    PermissionDenied(String),

    /// User has no active membership in the tenant.
    AccessDenied(String),

    NotFound { kind: ResourceKind, id: String },

    Conflict(String),

    /// Code unknown, or invitation no longer pending.
    InvitationInvalid(String),

    InvitationExpired(String),

    ContactMismatch,

    Validation { field: String, message: String },

    /// Store or identity provider unreachable.
    UpstreamUnavailable(String),
}

impl WorkspaceError {
    pub fn permission_denied(reason: impl Into<String>) -> Self {
        WorkspaceError::PermissionDenied(reason.into())
    }

    pub fn access_denied(reason: impl Into<String>) -> Self {
        WorkspaceError::AccessDenied(reason.into())
    }

    pub fn not_found(kind: ResourceKind, id: impl ToString) -> Self {
        WorkspaceError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        WorkspaceError::Conflict(reason.into())
    }

    pub fn invitation_invalid(code: impl Into<String>) -> Self {
        WorkspaceError::InvitationInvalid(code.into())
    }

    pub fn invitation_expired(code: impl Into<String>) -> Self {
        WorkspaceError::InvitationExpired(code.into())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        WorkspaceError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        WorkspaceError::UpstreamUnavailable(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            WorkspaceError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            WorkspaceError::AccessDenied(_) => ErrorCode::AccessDenied,
            WorkspaceError::NotFound { kind, .. } => kind.code(),
            WorkspaceError::Conflict(_) => ErrorCode::Conflict,
            WorkspaceError::InvitationInvalid(_) => ErrorCode::InvitationInvalid,
            WorkspaceError::InvitationExpired(_) => ErrorCode::InvitationExpired,
            WorkspaceError::ContactMismatch => ErrorCode::ContactMismatch,
            WorkspaceError::Validation { .. } => ErrorCode::ValidationFailed,
            WorkspaceError::UpstreamUnavailable(_) => ErrorCode::UpstreamUnavailable,
        }
    }

    /// Returns a stable, user-facing message.
    pub fn message(&self) -> String {
        match self {
            WorkspaceError::PermissionDenied(reason) => format!("Permission denied: {}", reason),
            WorkspaceError::AccessDenied(reason) => format!("Access denied: {}", reason),
            WorkspaceError::NotFound { kind, id } => format!("{} not found: {}", kind, id),
            WorkspaceError::Conflict(reason) => format!("Conflict: {}", reason),
            WorkspaceError::InvitationInvalid(code) => {
                format!("Invitation '{}' is invalid or has already been used", code)
            }
            WorkspaceError::InvitationExpired(code) => format!("Invitation '{}' has expired", code),
            WorkspaceError::ContactMismatch => {
                "Contact does not match the invitation".to_string()
            }
            WorkspaceError::Validation { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            WorkspaceError::UpstreamUnavailable(msg) => {
                format!("Service temporarily unavailable: {}", msg)
            }
        }
    }

    /// Returns true if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkspaceError::UpstreamUnavailable(_))
    }
}

impl fmt::Display for WorkspaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for WorkspaceError {}

impl From<DomainError> for WorkspaceError {
    fn from(err: DomainError) -> Self {
        let id = err
            .details
            .get("id")
            .cloned()
            .unwrap_or_else(|| err.message.clone());
        match err.code {
            ErrorCode::TenantNotFound => WorkspaceError::not_found(ResourceKind::Tenant, id),
            ErrorCode::UserNotFound => WorkspaceError::not_found(ResourceKind::User, id),
            ErrorCode::MembershipNotFound => WorkspaceError::not_found(ResourceKind::Membership, id),
            ErrorCode::InvitationNotFound => WorkspaceError::not_found(ResourceKind::Invitation, id),
            ErrorCode::PermissionDenied => WorkspaceError::PermissionDenied(err.message),
            ErrorCode::AccessDenied => WorkspaceError::AccessDenied(err.message),
            ErrorCode::Conflict | ErrorCode::InvalidStateTransition => {
                WorkspaceError::Conflict(err.message)
            }
            ErrorCode::InvitationInvalid => WorkspaceError::InvitationInvalid(err.message),
            ErrorCode::InvitationExpired => WorkspaceError::InvitationExpired(err.message),
            ErrorCode::ContactMismatch => WorkspaceError::ContactMismatch,
            ErrorCode::ValidationFailed => WorkspaceError::Validation {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::DatabaseError | ErrorCode::UpstreamUnavailable | ErrorCode::InternalError => {
                WorkspaceError::UpstreamUnavailable(err.message)
            }
        }
    }
}

impl From<ValidationError> for WorkspaceError {
    fn from(err: ValidationError) -> Self {
        WorkspaceError::Validation {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<WorkspaceError> for DomainError {
    fn from(err: WorkspaceError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
