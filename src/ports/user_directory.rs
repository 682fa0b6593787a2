//! User directory port: platform identities and their contact channels.

use crate::domain::foundation::{Contact, DomainError, UserId};
use crate::domain::tenancy::User;
use async_trait::async_trait;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find(&self, user_id: &UserId) -> Result<Option<User>, DomainError>;

    /// Resolve a contact to the user who owns it.
    async fn find_by_contact(&self, contact: &Contact) -> Result<Option<User>, DomainError>;

    /// Register or replace a user.
    ///
    /// # Errors
    ///
    /// - `Conflict` if one of the contacts belongs to another user
    async fn upsert(&self, user: &User) -> Result<(), DomainError>;

    async fn list_ids(&self) -> Result<Vec<UserId>, DomainError>;
}
