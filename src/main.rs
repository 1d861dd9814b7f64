//! Auth service HTTP entry point.
//!
//! # Purpose
//! Wires configuration, storage, token keys, and the HTTP router, then starts
//! the API server and the metrics endpoint.
//!
//! # Notes
//! The `build_state` helper keeps wiring testable and minimizes main setup
//! logic. The token signing secret is validated here at startup: a missing or
//! weak secret aborts the process instead of degrading to any default.
use anyhow::Context;
use docket_auth::app::{AppState, build_router};
use docket_auth::auth::password::hash_password;
use docket_auth::auth::token::TokenKeys;
use docket_auth::config::{self, BootstrapAdmin, StorageBackend};
use docket_auth::model::{Role, UserAccount};
use docket_auth::observability;
use docket_auth::store::memory::InMemoryStore;
use docket_auth::store::postgres::PostgresStore;
use docket_auth::store::{AuthStore, StoreError};
use std::future::Future;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::AuthServiceConfig::from_env_or_yaml().context("auth service config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(
    config: config::AuthServiceConfig,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("docket-auth");
    let state = build_state(config.clone()).await?;
    let backend = state.store.backend_name();
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state);

    let addr = config.bind_addr;
    tracing::info!(%addr, backend, "auth service listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

async fn build_state(config: config::AuthServiceConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn AuthStore + Send + Sync> = match config.storage {
        StorageBackend::Memory => Arc::new(InMemoryStore::new()),
        StorageBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .context("postgres configuration missing")?;
            Arc::new(PostgresStore::connect(pg).await?)
        }
    };

    let token_keys = TokenKeys::from_secret(&config.token_secret)
        .map_err(|err| anyhow::anyhow!("token signing secret rejected: {err}"))?;

    let state = AppState {
        store,
        token_keys,
        session_ttl: config.session_ttl,
        reset_ttl: config.reset_ttl,
        dev_mode: config.dev_mode,
    };

    if let Some(bootstrap) = config.bootstrap_admin.as_ref() {
        bootstrap_admin(&state, bootstrap).await?;
    }

    Ok(state)
}

/// Create the configured first admin account when it does not exist yet.
///
/// A conflict from the store is tolerated: another instance starting against
/// the same database may have created the account first.
async fn bootstrap_admin(state: &AppState, bootstrap: &BootstrapAdmin) -> anyhow::Result<()> {
    let existing = state
        .store
        .user_by_email(&bootstrap.email)
        .await
        .context("look up bootstrap admin")?;
    if existing.is_some() {
        return Ok(());
    }
    let password_hash = hash_password(&bootstrap.password).context("hash bootstrap password")?;
    let account = UserAccount {
        id: uuid::Uuid::new_v4(),
        email: bootstrap.email.clone(),
        password_hash,
        firstname: "Admin".to_string(),
        lastname: "Account".to_string(),
        role: Role::Admin,
        is_active: true,
        created_at: chrono::Utc::now(),
        last_login: None,
    };
    match state.store.create_user(account).await {
        Ok(created) => {
            tracing::info!(user_id = %created.id, "bootstrap admin created");
            Ok(())
        }
        Err(StoreError::Conflict(_)) => Ok(()),
        Err(err) => Err(err).context("create bootstrap admin"),
    }
}
