#![cfg_attr(not(test), deny(clippy::panic))]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use lightcycle_arena_server::config;
use lightcycle_arena_server::logging;
use lightcycle_arena_server::server::message_router::MessageRouter;
use lightcycle_arena_server::server::LobbyManager;
use lightcycle_arena_server::websocket::{create_router, AppState};

/// Light-Cycle Arena -- real-time WebSocket game server for a grid-based
/// light-cycle arena
#[derive(Parser, Debug)]
#[command(name = "lightcycle-arena-server")]
#[command(about = "A real-time WebSocket game server for a grid-based light-cycle arena")]
#[command(version)]
struct Cli {
    /// Print the loaded configuration to stdout (as JSON) and exit.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,

    /// Validate configuration and exit without starting the server.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Override the listen port from the loaded configuration.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load();
    if let Some(port) = cli.port {
        cfg.port = port;
    }

    if cli.print_config {
        let json = serde_json::to_string_pretty(&cfg)
            .map_err(|e| anyhow::anyhow!("failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    if let Err(err) = config::validate_config_security(&cfg) {
        if cli.validate_config {
            eprintln!("Configuration validation failed:\n{err}");
            std::process::exit(1);
        }
        return Err(err);
    }
    if cli.validate_config {
        println!("Configuration validation passed");
        println!();
        println!("Configuration summary:");
        println!("  Port: {}", cfg.port);
        println!("  Default grid size: {}", cfg.server.default_grid_size);
        println!("  Default max players: {}", cfg.server.default_max_players);
        println!("  Tick rate (ms): {}", cfg.server.tick_rate_ms);
        println!("  Reconnect window (ms): {}", cfg.server.reconnect_window_ms);
        return Ok(());
    }

    logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let sweep_interval_ms = cfg.server.session_sweep_interval_ms;

    let manager = Arc::new(LobbyManager::new(cfg.server.clone()));
    let router = Arc::new(MessageRouter::new(manager.clone()));

    tracing::info!(%addr, "starting light-cycle arena server");

    let sweep_manager = manager.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(sweep_interval_ms));
        loop {
            interval.tick().await;
            let now = chrono::Utc::now().timestamp_millis();
            sweep_manager.sweep(now).await;
            sweep_manager.metrics().log_snapshot();
        }
    });

    let state = AppState { manager, router };
    let app = create_router("*").with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");

    let shutdown = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
        };
        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler")
                .recv()
                .await;
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }
        tracing::info!("shutdown signal received");
    };

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
