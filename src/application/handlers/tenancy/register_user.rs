//! RegisterUserHandler - Command handler for recording a platform user.
//!
//! Called when an identity-provider account first reaches this service.
//! Platform roles are never set here; they come from configuration.

use std::sync::Arc;

use crate::application::ClaimsReconciler;
use crate::domain::foundation::{Contact, UserId};
use crate::domain::membership::WorkspaceError;
use crate::domain::tenancy::User;
use crate::ports::UserDirectory;

#[derive(Debug, Clone)]
pub struct RegisterUserCommand {
    pub user_id: UserId,
    pub display_name: String,
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Clone)]
pub struct RegisterUserResult {
    pub user: User,
    pub created: bool,
}

pub struct RegisterUserHandler {
    users: Arc<dyn UserDirectory>,
    reconciler: Arc<ClaimsReconciler>,
}

impl RegisterUserHandler {
    pub fn new(users: Arc<dyn UserDirectory>, reconciler: Arc<ClaimsReconciler>) -> Self {
        Self { users, reconciler }
    }

    pub async fn handle(
        &self,
        cmd: RegisterUserCommand,
    ) -> Result<RegisterUserResult, WorkspaceError> {
        let existing = self.users.find(&cmd.user_id).await?;
        let created = existing.is_none();

        let mut user = User::new(cmd.user_id.clone(), cmd.display_name, cmd.contacts)?;
        user.platform_role = existing.and_then(|u| u.platform_role);

        // Fails with Conflict if a contact already belongs to someone else.
        self.users.upsert(&user).await?;

        tracing::info!(user_id = %user.id, created, "User registered");
        self.reconciler.reconcile_after_write(&user.id).await;

        Ok(RegisterUserResult { user, created })
    }
}
