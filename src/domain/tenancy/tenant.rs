//! Tenant entity: a partner organization's isolated workspace.

use crate::domain::foundation::{TenantId, Timestamp, UserId, ValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Disabled,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Disabled => "disabled",
        }
    }
}

impl std::str::FromStr for TenantStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TenantStatus::Active),
            "disabled" => Ok(TenantStatus::Disabled),
            other => Err(ValidationError::invalid_format(
                "tenant_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

/// A tenant and the namespace the identity provider scopes its credentials to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,

    /// Isolation identifier used by the identity provider. Appears in the
    /// legacy `tenant` claim.
    pub auth_namespace: String,

    pub status: TenantStatus,
    pub created_by: UserId,
    pub created_at: Timestamp,
}

impl Tenant {
    /// Creates a tenant after validating its name and namespace.
    ///
    /// The namespace is lowercased; it may contain ASCII letters, digits and `-`.
    pub fn create(
        id: TenantId,
        name: impl Into<String>,
        auth_namespace: impl AsRef<str>,
        created_by: UserId,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if name.chars().count() > 120 {
            return Err(ValidationError::out_of_range(
                "name_length",
                1,
                120,
                name.chars().count() as i32,
            ));
        }

        let auth_namespace = auth_namespace.as_ref().trim().to_lowercase();
        if auth_namespace.is_empty() {
            return Err(ValidationError::empty_field("auth_namespace"));
        }
        if !auth_namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ValidationError::invalid_format(
                "auth_namespace",
                "letters, digits and '-' only",
            ));
        }

        Ok(Self {
            id,
            name,
            auth_namespace,
            status: TenantStatus::Active,
            created_by,
            created_at: now,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> UserId {
        UserId::new("platform-admin").unwrap()
    }

    #[test]
    fn create_normalizes_namespace() {
        let t = Tenant::create(TenantId::new(), " Acme Corp ", "Acme-Corp", admin(), Timestamp::now())
            .unwrap();
        assert_eq!(t.name, "Acme Corp");
        assert_eq!(t.auth_namespace, "acme-corp");
        assert!(t.is_active());
    }

    #[test]
    fn create_rejects_empty_name() {
        let err = Tenant::create(TenantId::new(), "  ", "acme", admin(), Timestamp::now()).unwrap_err();
        assert_eq!(err.field(), "name");
    }

    #[test]
    fn create_rejects_namespace_with_spaces() {
        assert!(Tenant::create(TenantId::new(), "Acme", "acme corp", admin(), Timestamp::now()).is_err());
    }
}
