//! Chase Server - authoritative server for a multiplayer tag game
//!
//! Players connect over WebSocket, get grouped into lobbies, and play
//! rounds of chasers versus a single victim. Every match runs its own
//! fixed-rate tick loop; HTTP exposes health and match listings.

mod app;
mod config;
mod game;
mod http;
mod matchmaking;
mod util;
mod ws;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app::AppState;
use crate::config::Config;
use crate::http::build_router;
use crate::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine, real deployments set the environment directly
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config);
    init_server_time();

    let addr = config.server_addr;
    info!(
        addr = %addr,
        min_players = config.game.min_players,
        max_players = config.game.max_players,
        lobby_wait_secs = config.game.lobby_wait_secs,
        setup_secs = config.game.timings.setup_secs,
        round_secs = config.game.timings.round_secs,
        "Starting chase server"
    );

    let router = build_router(AppState::new(config));
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {} (ws://{}/ws)", addr, addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
