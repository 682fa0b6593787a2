//! In-memory user directory.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{Contact, DomainError, ErrorCode, UserId};
use crate::domain::tenancy::User;
use crate::ports::UserDirectory;

#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<BTreeMap<UserId, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find(&self, user_id: &UserId) -> Result<Option<User>, DomainError> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn find_by_contact(&self, contact: &Contact) -> Result<Option<User>, DomainError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.has_contact(contact))
            .cloned())
    }

    async fn upsert(&self, user: &User) -> Result<(), DomainError> {
        let mut users = self.users.write().await;
        if let Some(owner) = users
            .values()
            .find(|u| u.id != user.id && user.contacts.iter().any(|c| u.has_contact(c)))
        {
            return Err(DomainError::new(ErrorCode::Conflict, "Contact belongs to another user")
                .with_detail("owner", owner.id.to_string()));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<UserId>, DomainError> {
        Ok(self.users.read().await.keys().cloned().collect())
    }
}
