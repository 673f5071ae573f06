use std::sync::Arc;

use bento_authz::auth::TokenVerifier;
use bento_authz::config::Config;
use bento_authz::errors::set_debug_mode;
use bento_authz::http::{router, AppState};
use bento_authz::policy::PolicyEngine;
use bento_authz::store::postgres::PgStore;
use bento_authz::store::Store;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    set_debug_mode(config.debug);

    let store = PgStore::connect(&config.database_uri, config.db_max_connections).await?;
    store.migrate().await?;
    let store: Arc<dyn Store> = Arc::new(store);

    let verifier = TokenVerifier::new(
        config.openid_config_url.clone(),
        config.token_audience.clone(),
        config.jwt_leeway_secs,
        config.jwks_cache_ttl.as_secs(),
        config.disable_token_verification,
    );
    let policy = PolicyEngine::new(store.clone(), config.superusers.clone());

    let bind_address = config.bind_address.clone();
    let state = Arc::new(AppState { store, verifier, policy, config });
    let app = router(state);

    tracing::info!(%bind_address, "starting bento-authz");
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
