//! In-memory invitation store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, InvitationId, TenantId, Timestamp};
use crate::domain::invitation::{Invitation, InvitationCode, InvitationStatus};
use crate::ports::InvitationStore;

#[derive(Debug, Default)]
pub struct InMemoryInvitationStore {
    invitations: RwLock<HashMap<InvitationId, Invitation>>,
}

impl InMemoryInvitationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvitationStore for InMemoryInvitationStore {
    async fn insert(&self, invitation: &Invitation) -> Result<(), DomainError> {
        let mut invitations = self.invitations.write().await;
        if invitations.contains_key(&invitation.id) {
            return Err(DomainError::new(ErrorCode::Conflict, "Invitation already exists")
                .with_detail("id", invitation.id.to_string()));
        }
        if invitation.is_pending()
            && invitations
                .values()
                .any(|i| i.is_pending() && i.code == invitation.code)
        {
            return Err(DomainError::new(ErrorCode::Conflict, "Invitation code already in use")
                .with_detail("code", invitation.code.to_string()));
        }
        invitations.insert(invitation.id, invitation.clone());
        Ok(())
    }

    async fn update_if_status(
        &self,
        invitation: &Invitation,
        expected: InvitationStatus,
    ) -> Result<bool, DomainError> {
        let mut invitations = self.invitations.write().await;
        let stored = invitations.get_mut(&invitation.id).ok_or_else(|| {
            DomainError::new(ErrorCode::InvitationNotFound, "Invitation not found")
                .with_detail("id", invitation.id.to_string())
        })?;
        if stored.status != expected {
            return Ok(false);
        }
        *stored = invitation.clone();
        Ok(true)
    }

    async fn find_by_id(&self, id: InvitationId) -> Result<Option<Invitation>, DomainError> {
        Ok(self.invitations.read().await.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &InvitationCode) -> Result<Option<Invitation>, DomainError> {
        let invitations = self.invitations.read().await;
        let found = invitations
            .values()
            .filter(|i| &i.code == code)
            .max_by_key(|i| (i.is_pending(), i.created_at));
        Ok(found.cloned())
    }

    async fn code_in_use(&self, code: &InvitationCode) -> Result<bool, DomainError> {
        Ok(self
            .invitations
            .read()
            .await
            .values()
            .any(|i| i.is_pending() && &i.code == code))
    }

    async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<Invitation>, DomainError> {
        let mut found: Vec<Invitation> = self
            .invitations
            .read()
            .await
            .values()
            .filter(|i| i.tenant_id == tenant_id)
            .cloned()
            .collect();
        found.sort_by_key(|i| i.created_at);
        Ok(found)
    }

    async fn list_overdue(&self, now: Timestamp) -> Result<Vec<Invitation>, DomainError> {
        Ok(self
            .invitations
            .read()
            .await
            .values()
            .filter(|i| i.is_pending() && i.is_overdue(now))
            .cloned()
            .collect())
    }

    async fn delete_by_tenant(&self, tenant_id: TenantId) -> Result<u64, DomainError> {
        let mut invitations = self.invitations.write().await;
        let before = invitations.len();
        invitations.retain(|_, i| i.tenant_id != tenant_id);
        Ok((before - invitations.len()) as u64)
    }
}
