//! Workspace roles and the permissions they carry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Role held by a user, either inside one tenant or platform-wide.
///
/// `PartnerAdmin` and `Employee` are tenant roles. `Admin` and `SuperAdmin`
/// are platform roles that may also appear on a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    PartnerAdmin,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::PartnerAdmin => "partner_admin",
            Role::Employee => "employee",
        }
    }

    /// Returns true for the platform-level roles.
    pub fn is_platform_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }

    /// Returns true if holders may invite, suspend, and reactivate members.
    pub fn can_manage_members(&self) -> bool {
        !matches!(self, Role::Employee)
    }

    /// Returns true if a holder of this role may hand out `other`.
    ///
    /// Nobody grants a role above their own, and partner admins stay
    /// inside the tenant roles.
    pub fn can_grant(&self, other: Role) -> bool {
        match self {
            Role::SuperAdmin => true,
            Role::Admin => other != Role::SuperAdmin,
            Role::PartnerAdmin => matches!(other, Role::PartnerAdmin | Role::Employee),
            Role::Employee => false,
        }
    }

    /// Permissions implied by this role when none are set explicitly.
    pub fn default_permissions(&self) -> BTreeSet<Permission> {
        use Permission::*;
        let granted: &[Permission] = match self {
            Role::SuperAdmin => &[
                MembersInvite,
                MembersManage,
                MembersDelete,
                TenantsManage,
                WorkspaceRead,
                WorkspaceWrite,
            ],
            Role::Admin => &[
                MembersInvite,
                MembersManage,
                TenantsManage,
                WorkspaceRead,
                WorkspaceWrite,
            ],
            Role::PartnerAdmin => &[MembersInvite, MembersManage, WorkspaceRead, WorkspaceWrite],
            Role::Employee => &[WorkspaceRead],
        };
        granted.iter().copied().collect()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "super_admin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "partner_admin" => Ok(Role::PartnerAdmin),
            "employee" => Ok(Role::Employee),
            other => Err(ValidationError::invalid_format(
                "role",
                format!("unknown role '{}'", other),
            )),
        }
    }
}

/// Fine-grained permission carried in session claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "members:invite")]
    MembersInvite,
    #[serde(rename = "members:manage")]
    MembersManage,
    #[serde(rename = "members:delete")]
    MembersDelete,
    #[serde(rename = "tenants:manage")]
    TenantsManage,
    #[serde(rename = "workspace:read")]
    WorkspaceRead,
    #[serde(rename = "workspace:write")]
    WorkspaceWrite,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::MembersInvite => "members:invite",
            Permission::MembersManage => "members:manage",
            Permission::MembersDelete => "members:delete",
            Permission::TenantsManage => "tenants:manage",
            Permission::WorkspaceRead => "workspace:read",
            Permission::WorkspaceWrite => "workspace:write",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Permission {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Permission::MembersInvite,
            Permission::MembersManage,
            Permission::MembersDelete,
            Permission::TenantsManage,
            Permission::WorkspaceRead,
            Permission::WorkspaceWrite,
        ]
        .into_iter()
        .find(|p| p.as_str() == s)
        .ok_or_else(|| ValidationError::invalid_format("permission", format!("unknown permission '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partner_admin_grants_only_tenant_roles() {
        assert!(Role::PartnerAdmin.can_grant(Role::Employee));
        assert!(Role::PartnerAdmin.can_grant(Role::PartnerAdmin));
        assert!(!Role::PartnerAdmin.can_grant(Role::Admin));
        assert!(!Role::PartnerAdmin.can_grant(Role::SuperAdmin));
    }

    #[test]
    fn admin_cannot_grant_super_admin() {
        assert!(Role::Admin.can_grant(Role::Admin));
        assert!(!Role::Admin.can_grant(Role::SuperAdmin));
        assert!(Role::SuperAdmin.can_grant(Role::SuperAdmin));
    }

    #[test]
    fn employee_grants_nothing() {
        for role in [Role::SuperAdmin, Role::Admin, Role::PartnerAdmin, Role::Employee] {
            assert!(!Role::Employee.can_grant(role));
        }
    }

    #[test]
    fn employee_can_only_read() {
        let perms = Role::Employee.default_permissions();
        assert_eq!(perms.len(), 1);
        assert!(perms.contains(&Permission::WorkspaceRead));
    }

    #[test]
    fn only_super_admin_deletes_members() {
        assert!(Role::SuperAdmin.default_permissions().contains(&Permission::MembersDelete));
        assert!(!Role::Admin.default_permissions().contains(&Permission::MembersDelete));
    }

    #[test]
    fn role_parses_wire_names() {
        assert_eq!("partner_admin".parse::<Role>().unwrap(), Role::PartnerAdmin);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn permission_serializes_with_colon_name() {
        let json = serde_json::to_string(&Permission::MembersInvite).unwrap();
        assert_eq!(json, "\"members:invite\"");
        assert_eq!("workspace:write".parse::<Permission>().unwrap(), Permission::WorkspaceWrite);
    }
}
