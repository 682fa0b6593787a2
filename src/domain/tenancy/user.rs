//! Platform user identity, independent of any tenant.

use crate::domain::foundation::{Contact, UserId, ValidationError};
use crate::domain::membership::Role;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: String,

    /// Email and/or phone. Never empty.
    pub contacts: Vec<Contact>,

    /// `admin` or `super_admin` for platform operators.
    pub platform_role: Option<Role>,
}

impl User {
    /// Creates a user, requiring at least one contact channel.
    pub fn new(
        id: UserId,
        display_name: impl Into<String>,
        contacts: Vec<Contact>,
    ) -> Result<Self, ValidationError> {
        if contacts.is_empty() {
            return Err(ValidationError::empty_field("contacts"));
        }
        let mut contacts = contacts;
        contacts.sort();
        contacts.dedup();
        Ok(Self {
            id,
            display_name: display_name.into(),
            contacts,
            platform_role: None,
        })
    }

    /// Grants a platform role. Tenant roles are ignored.
    pub fn with_platform_role(mut self, role: Role) -> Self {
        if role.is_platform_admin() {
            self.platform_role = Some(role);
        }
        self
    }

    pub fn is_platform_admin(&self) -> bool {
        self.platform_role.is_some()
    }

    pub fn is_super_admin(&self) -> bool {
        self.platform_role == Some(Role::SuperAdmin)
    }

    pub fn has_contact(&self, contact: &Contact) -> bool {
        self.contacts.contains(contact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_requires_a_contact() {
        let err = User::new(UserId::new("u-1").unwrap(), "Jane", vec![]).unwrap_err();
        assert_eq!(err.field(), "contacts");
    }

    #[test]
    fn contacts_are_deduplicated() {
        let email = Contact::email("jane@example.com").unwrap();
        let user = User::new(
            UserId::new("u-1").unwrap(),
            "Jane",
            vec![email.clone(), Contact::email("JANE@example.com").unwrap()],
        )
        .unwrap();
        assert_eq!(user.contacts, vec![email.clone()]);
        assert!(user.has_contact(&email));
    }

    #[test]
    fn tenant_role_is_not_a_platform_role() {
        let email = Contact::email("jane@example.com").unwrap();
        let user = User::new(UserId::new("u-1").unwrap(), "Jane", vec![email])
            .unwrap()
            .with_platform_role(Role::PartnerAdmin);
        assert!(!user.is_platform_admin());
    }

    #[test]
    fn super_admin_is_platform_admin() {
        let email = Contact::email("root@example.com").unwrap();
        let user = User::new(UserId::new("root").unwrap(), "Root", vec![email])
            .unwrap()
            .with_platform_role(Role::SuperAdmin);
        assert!(user.is_platform_admin());
        assert!(user.is_super_admin());
    }
}
