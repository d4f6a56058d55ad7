use std::sync::Arc;

use anyhow::Context;

use haocai_api::app::{self, AppState};
use haocai_api::config::ApiConfig;
use haocai_auth::{Hs256TokenService, InMemoryIdentityLoader, RoleCatalog};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    haocai_observability::init();

    let config = ApiConfig::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    let identities = load_identities(&config)?;
    let ttl = chrono::Duration::from_std(config.jwt_ttl).context("JWT_TTL_SECS out of range")?;
    let tokens = Hs256TokenService::new(config.jwt_secret.as_bytes(), ttl, config.jwt_issuer.clone());

    let tokens = Arc::new(tokens);
    let identities = Arc::new(identities);
    let state = AppState::from_config(tokens.clone(), identities.clone(), &config)
        .with_login(tokens, identities);
    let app = app::build_app(state)?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn load_identities(config: &ApiConfig) -> anyhow::Result<InMemoryIdentityLoader> {
    let Some(path) = &config.users_file else {
        tracing::warn!("HAOCAI_USERS_FILE not set; no user can authenticate");
        return Ok(InMemoryIdentityLoader::new(RoleCatalog::materials_defaults()));
    };

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let loader = InMemoryIdentityLoader::from_json(&json, RoleCatalog::materials_defaults())
        .with_context(|| format!("invalid user seed {}", path.display()))?;
    tracing::info!(users = loader.len(), "identity seed loaded");
    Ok(loader)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
