//! Passkey Server - WebAuthn Relying Party over HTTP
//!
//! - POST /api/webauthn/register/{start,finish}
//! - POST /api/webauthn/login/{start,finish}
//! - GET /health, GET /ready, Swagger UI at /docs

use std::net::SocketAddr;
use std::time::Duration;

use passkey_server::{create_router_with_config, AppState, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,passkey_server=debug,passkey_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        rp_id = %config.webauthn.rp_id,
        origins = ?config.webauthn.rp_origins,
        users = config.webauthn.demo_users.len(),
        "Configuration loaded"
    );

    let state = AppState::from_config(&config.webauthn)?;

    // Expired and consumed challenges are otherwise only dropped lazily
    let engine = state.engine.clone();
    let purge_every = Duration::from_secs(config.purge_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(purge_every);
        loop {
            interval.tick().await;
            let purged = engine.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "Purged dead challenges");
            }
        }
    });

    let app = create_router_with_config(state, &config);

    let addr = config.socket_addr();
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("API docs at http://{}/docs", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
