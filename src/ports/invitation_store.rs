//! Invitation store port.
//!
//! # Contract
//!
//! - A code is unique among `pending` invitations; older, finished invitations
//!   may share it
//! - `update_if_status` is a compare-and-set on the status field, so two
//!   concurrent acceptances of one code cannot both win

use crate::domain::foundation::{DomainError, InvitationId, TenantId, Timestamp};
use crate::domain::invitation::{Invitation, InvitationCode, InvitationStatus};
use async_trait::async_trait;

#[async_trait]
pub trait InvitationStore: Send + Sync {
    /// Insert a new invitation.
    ///
    /// # Errors
    ///
    /// - `Conflict` if a pending invitation already uses the code
    /// - `DatabaseError` on persistence failure
    async fn insert(&self, invitation: &Invitation) -> Result<(), DomainError>;

    /// Replace the stored invitation only if its current status is `expected`.
    ///
    /// Returns false when the stored status differs.
    ///
    /// # Errors
    ///
    /// - `InvitationNotFound` if the invitation doesn't exist
    async fn update_if_status(
        &self,
        invitation: &Invitation,
        expected: InvitationStatus,
    ) -> Result<bool, DomainError>;

    async fn find_by_id(&self, id: InvitationId) -> Result<Option<Invitation>, DomainError>;

    /// Find by code, preferring the pending invitation, else the newest one.
    async fn find_by_code(&self, code: &InvitationCode) -> Result<Option<Invitation>, DomainError>;

    /// True if a pending invitation uses the code.
    async fn code_in_use(&self, code: &InvitationCode) -> Result<bool, DomainError>;

    async fn list_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<Invitation>, DomainError>;

    /// Pending invitations whose expiry is before `now`.
    async fn list_overdue(&self, now: Timestamp) -> Result<Vec<Invitation>, DomainError>;

    /// Delete every invitation of a tenant, returning how many were removed.
    async fn delete_by_tenant(&self, tenant_id: TenantId) -> Result<u64, DomainError>;
}
