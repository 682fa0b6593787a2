//! Claims reconciler.
//!
//! Recomputes a user's session claims from store state and overwrites the
//! payload held by the identity provider. Safe to run any number of times:
//! identical store state always yields byte-identical payloads.
//!
//! Writes are retried with exponential backoff while the identity provider
//! reports a transient failure. Handlers call [`ClaimsReconciler::reconcile_after_write`],
//! which runs in its own task so dropping the caller does not abort it.
//! Failures there are logged, and the user is parked in a pending set that
//! [`ClaimsReconciler::retry_pending`] drains from a background sweep.
//!
//! Derive-and-write runs under a per-user lock. A reconcile always starts
//! after its own store write, so the last one to take the lock sees every
//! write that preceded it and the stored payload ends up matching the store.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use tokio::sync::Mutex;

use crate::domain::claims::{derive_claims, ClaimsSource, SessionClaims};
use crate::domain::foundation::{TenantId, UserId};
use crate::domain::membership::WorkspaceError;
use crate::ports::{
    IdentityError, IdentityProvider, MembershipStore, TenantStore, UserDirectory, VerifiedSession,
};

/// Backoff settings for claims writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(2),
        }
    }
}

/// Outcome of the self-healing session read path.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSession {
    pub user_id: UserId,

    /// Claims derived from current store state.
    pub claims: SessionClaims,

    /// True when the presented token's snapshot is stale and the client
    /// should fetch a new token.
    pub refresh_required: bool,

    /// True when the stored payload had diverged and was rewritten.
    pub healed: bool,
}

/// Summary of a bulk reconciliation sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub reconciled: usize,
    pub failed: Vec<UserId>,
}

pub struct ClaimsReconciler {
    memberships: Arc<dyn MembershipStore>,
    tenants: Arc<dyn TenantStore>,
    users: Arc<dyn UserDirectory>,
    identity: Arc<dyn IdentityProvider>,
    retry: RetryPolicy,

    /// Users whose post-write reconciliation failed.
    pending: Mutex<BTreeSet<UserId>>,

    user_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl ClaimsReconciler {
    pub fn new(
        memberships: Arc<dyn MembershipStore>,
        tenants: Arc<dyn TenantStore>,
        users: Arc<dyn UserDirectory>,
        identity: Arc<dyn IdentityProvider>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            memberships,
            tenants,
            users,
            identity,
            retry,
            pending: Mutex::new(BTreeSet::new()),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Derives the claims the store currently implies, without writing them.
    pub async fn derive(&self, user_id: &UserId) -> Result<SessionClaims, WorkspaceError> {
        let memberships = self.memberships.list_by_user(user_id).await?;
        let preferred = self.memberships.get_active_tenant(user_id).await?;
        let tenant_ids: Vec<TenantId> = memberships.iter().map(|m| m.tenant_id).collect();
        let namespaces = self.tenants.namespaces(&tenant_ids).await?;
        let platform_role = self
            .users
            .find(user_id)
            .await?
            .and_then(|u| u.platform_role);

        Ok(derive_claims(ClaimsSource {
            platform_role,
            memberships: &memberships,
            namespaces: &namespaces,
            preferred_tenant: preferred,
        }))
    }

    /// Derives claims from a fresh store read and overwrites the provider's copy.
    pub async fn reconcile(&self, user_id: &UserId) -> Result<SessionClaims, WorkspaceError> {
        let lock = self.lock_user(user_id).await;
        let result = async {
            let _guard = lock.lock().await;
            let claims = self.derive(user_id).await?;
            self.write_claims(user_id, &claims).await?;
            Ok::<_, WorkspaceError>(claims)
        }
        .await;
        self.unlock_user(user_id, lock).await;
        let claims = result?;

        tracing::debug!(
            user_id = %user_id,
            workspaces = claims.memberships.len(),
            active_tenant = ?claims.active_tenant.tenant_id(),
            "Claims reconciled"
        );
        Ok(claims)
    }

    /// Reconciles after a store write has been sent.
    ///
    /// Runs on a spawned task and waits for it; the task finishes even if
    /// this future is dropped. A failure parks the user for
    /// [`Self::retry_pending`] and returns `None`.
    pub async fn reconcile_after_write(self: &Arc<Self>, user_id: &UserId) -> Option<SessionClaims> {
        let reconciler = Arc::clone(self);
        let owned = user_id.clone();
        let task = tokio::spawn(async move {
            match reconciler.reconcile(&owned).await {
                Ok(claims) => {
                    reconciler.pending.lock().await.remove(&owned);
                    Some(claims)
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = %owned,
                        error = %e,
                        "Claims reconciliation failed; queued for retry"
                    );
                    reconciler.pending.lock().await.insert(owned);
                    None
                }
            }
        });

        task.await.unwrap_or_else(|e| {
            tracing::error!(user_id = %user_id, error = %e, "Claims reconciliation task aborted");
            None
        })
    }

    /// Users still waiting for a successful reconciliation.
    pub async fn pending_users(&self) -> Vec<UserId> {
        self.pending.lock().await.iter().cloned().collect()
    }

    /// Drains the pending set through [`Self::reconcile_all`]. Users that
    /// fail again stay queued for the next sweep.
    pub async fn retry_pending(&self) -> ReconcileReport {
        let queued: Vec<UserId> = std::mem::take(&mut *self.pending.lock().await)
            .into_iter()
            .collect();
        if queued.is_empty() {
            return ReconcileReport::default();
        }

        let report = self.reconcile_all(&queued).await;
        self.pending.lock().await.extend(report.failed.iter().cloned());
        report
    }

    /// Verifies a session token and heals claims if they diverged.
    pub async fn resolve_session(&self, token: &str) -> Result<ResolvedSession, WorkspaceError> {
        let session = self
            .identity
            .verify_session_token(token)
            .await
            .map_err(session_error)?;
        self.resolve_verified(&session).await
    }

    /// Self-healing read path for an already verified session.
    pub async fn resolve_verified(
        &self,
        session: &VerifiedSession,
    ) -> Result<ResolvedSession, WorkspaceError> {
        let lock = self.lock_user(&session.user_id).await;
        let result = async {
            let _guard = lock.lock().await;
            self.heal(session).await
        }
        .await;
        self.unlock_user(&session.user_id, lock).await;
        result
    }

    async fn heal(&self, session: &VerifiedSession) -> Result<ResolvedSession, WorkspaceError> {
        let expected = self.derive(&session.user_id).await?;
        let expected_payload = expected.to_payload();

        let stored = self
            .identity
            .get_claims(&session.user_id)
            .await
            .map_err(upstream_error)?;

        let diverged = stored.as_ref() != Some(&expected_payload);
        let mut healed = false;
        if diverged {
            tracing::info!(user_id = %session.user_id, "Stored claims diverged from store state; reconciling");
            match self.write_claims(&session.user_id, &expected).await {
                Ok(()) => {
                    healed = true;
                    self.pending.lock().await.remove(&session.user_id);
                }
                Err(e) => tracing::warn!(
                    user_id = %session.user_id,
                    error = %e,
                    "Healing write failed; serving derived claims"
                ),
            }
        }

        Ok(ResolvedSession {
            user_id: session.user_id.clone(),
            refresh_required: session.claims_snapshot != expected_payload,
            claims: expected,
            healed,
        })
    }

    async fn lock_user(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        Arc::clone(locks.entry(user_id.clone()).or_default())
    }

    /// Drops the map entry once no other reconcile holds or awaits it.
    async fn unlock_user(&self, user_id: &UserId, lock: Arc<Mutex<()>>) {
        let mut locks = self.user_locks.lock().await;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(user_id);
        }
    }

    /// Reconciles every listed user, continuing past failures.
    pub async fn reconcile_all(&self, user_ids: &[UserId]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        for user_id in user_ids {
            match self.reconcile(user_id).await {
                Ok(_) => report.reconciled += 1,
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Reconciliation sweep failed for user");
                    report.failed.push(user_id.clone());
                }
            }
        }
        tracing::info!(
            reconciled = report.reconciled,
            failed = report.failed.len(),
            "Reconciliation sweep finished"
        );
        report
    }

    async fn write_claims(
        &self,
        user_id: &UserId,
        claims: &SessionClaims,
    ) -> Result<(), WorkspaceError> {
        let payload = claims.to_payload();
        let identity = &self.identity;

        // backon counts retries, not attempts.
        let backoff = ExponentialBuilder::default()
            .with_min_delay(self.retry.initial_backoff)
            .with_max_delay(self.retry.max_backoff)
            .with_max_times(self.retry.max_attempts.saturating_sub(1) as usize);

        (|| {
            let payload = payload.clone();
            async move { identity.set_claims(user_id, payload).await }
        })
        .retry(backoff)
        .sleep(tokio::time::sleep)
        .when(|e: &IdentityError| e.is_transient())
        .notify(|e: &IdentityError, dur: Duration| {
            tracing::debug!(
                user_id = %user_id,
                backoff_ms = dur.as_millis() as u64,
                error = %e,
                "Retrying claims write after backoff"
            );
        })
        .await
        .map_err(upstream_error)
    }
}

fn upstream_error(err: IdentityError) -> WorkspaceError {
    WorkspaceError::upstream(err.to_string())
}

fn session_error(err: IdentityError) -> WorkspaceError {
    if err.requires_reauthentication() {
        WorkspaceError::permission_denied(err.to_string())
    } else {
        upstream_error(err)
    }
}
