//! Workspace Access server entry point.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use workspace_access::adapters::http::{workspace_router, WorkspaceAppState};
use workspace_access::adapters::{memory, postgres, LocalIdentityProvider};
use workspace_access::application::{
    ActionDispatcher, Dependencies, ExpireInvitationsCommand, InvitationPolicy, RetryPolicy,
};
use workspace_access::config::{AppConfig, Environment, IdentityConfig, StorageBackend};
use workspace_access::domain::foundation::{Contact, DomainError, Timestamp, UserId};
use workspace_access::domain::membership::Role;
use workspace_access::domain::tenancy::User;
use workspace_access::ports::{
    AuditSink, InvitationStore, MembershipStore, TenantStore, UserDirectory,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

struct Stores {
    memberships: Arc<dyn MembershipStore>,
    invitations: Arc<dyn InvitationStore>,
    tenants: Arc<dyn TenantStore>,
    users: Arc<dyn UserDirectory>,
    audit: Arc<dyn AuditSink>,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // 1. Configuration
    let config = AppConfig::load()?;
    config.validate()?;

    // 2. Logging
    init_tracing(&config.logging.filter, config.logging.json);
    tracing::info!(
        environment = ?config.server.environment,
        backend = ?config.database.backend,
        "Starting workspace-access"
    );

    // 3. Adapters
    let stores = build_stores(&config).await?;
    let identity = Arc::new(LocalIdentityProvider::new(
        config.identity.issuer.clone(),
        &config.identity.token_secret,
        config.identity.token_ttl_secs,
    ));

    let dispatcher = Arc::new(ActionDispatcher::new(Dependencies {
        memberships: stores.memberships,
        invitations: stores.invitations,
        tenants: stores.tenants,
        users: stores.users.clone(),
        audit: stores.audit,
        identity: identity.clone(),
        invitation_policy: InvitationPolicy::from(&config.invitation),
        retry_policy: RetryPolicy::from(&config.reconciler),
    }));

    bootstrap_admin(&config, stores.users.as_ref(), &dispatcher, &identity).await?;

    // 4. Background sweeps: invitation expiry, claims retry
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut sweeps = Vec::new();
    if let Some(period) = config.invitation.sweep_interval() {
        sweeps.push(tokio::spawn(run_expiry_sweep(
            dispatcher.clone(),
            period,
            shutdown_rx.clone(),
        )));
    }
    if let Some(period) = config.reconciler.sweep_interval() {
        sweeps.push(tokio::spawn(run_reconcile_sweep(
            dispatcher.clone(),
            period,
            shutdown_rx,
        )));
    }

    // 5. HTTP
    let state = WorkspaceAppState {
        dispatcher,
        identity,
    };
    let router = workspace_router(
        state,
        config.server.request_timeout(),
        &config.server.cors_origins_list(),
    );

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    for sweep in sweeps {
        let _ = sweep.await;
    }
    tracing::info!("Shut down cleanly");
    Ok(())
}

fn init_tracing(directive: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

async fn build_stores(config: &AppConfig) -> Result<Stores, DomainError> {
    let stores = match config.database.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory stores; state is lost on restart");
            Stores {
                memberships: Arc::new(memory::InMemoryMembershipStore::new()),
                invitations: Arc::new(memory::InMemoryInvitationStore::new()),
                tenants: Arc::new(memory::InMemoryTenantStore::new()),
                users: Arc::new(memory::InMemoryUserDirectory::new()),
                audit: Arc::new(memory::InMemoryAuditLog::new()),
            }
        }
        StorageBackend::Postgres => {
            let pool = postgres::connect(&config.database).await?;
            Stores {
                memberships: Arc::new(postgres::PostgresMembershipStore::new(pool.clone())),
                invitations: Arc::new(postgres::PostgresInvitationStore::new(pool.clone())),
                tenants: Arc::new(postgres::PostgresTenantStore::new(pool.clone())),
                users: Arc::new(postgres::PostgresUserDirectory::new(pool.clone())),
                audit: Arc::new(postgres::PostgresAuditLog::new(pool)),
            }
        }
    };
    Ok(stores)
}

/// Ensures the configured operator exists as a super admin.
async fn bootstrap_admin(
    config: &AppConfig,
    users: &dyn UserDirectory,
    dispatcher: &ActionDispatcher,
    identity: &LocalIdentityProvider,
) -> Result<(), BoxError> {
    let IdentityConfig {
        bootstrap_admin_id: Some(id),
        bootstrap_admin_email: Some(email),
        ..
    } = &config.identity
    else {
        return Ok(());
    };

    let user_id = UserId::new(id.as_str())?;
    let admin = match users.find(&user_id).await? {
        Some(existing) => existing.with_platform_role(Role::SuperAdmin),
        None => User::new(user_id.clone(), "Administrator", vec![Contact::email(email)?])?
            .with_platform_role(Role::SuperAdmin),
    };
    users.upsert(&admin).await?;
    dispatcher.reconciler().reconcile(&user_id).await?;
    tracing::info!(user_id = %user_id, "Bootstrap admin ready");

    if config.server.environment == Environment::Development {
        let token = identity.issue_token(&user_id).await?;
        tracing::info!(token = %token, "Development session token for bootstrap admin");
    }
    Ok(())
}

async fn run_expiry_sweep(
    dispatcher: Arc<ActionDispatcher>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let cmd = ExpireInvitationsCommand { now: Timestamp::now() };
                if let Err(e) = dispatcher.expiry_sweep().handle(cmd).await {
                    tracing::warn!(error = %e, "Invitation expiry sweep failed");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

/// Retries reconciliations that failed after a store write.
async fn run_reconcile_sweep(
    dispatcher: Arc<ActionDispatcher>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = dispatcher.reconciler().retry_pending().await;
                if !report.failed.is_empty() {
                    tracing::warn!(still_pending = report.failed.len(), "Claims retry sweep left users queued");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
