use std::panic;

use tabserv::config::Config;
use tabserv::{build_app, AppState};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "tabserv=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    let relay = config.relay_config().unwrap_or_else(|e| {
        error!("Invalid relay timings: {}", e);
        warn!("Using default relay timings");
        Default::default()
    });

    let state = AppState::new(relay);
    let shutdown = state.shutdown.clone();
    let connections = state.connections.clone();
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {}: {}", config.server_address(), e));

    info!("🚀 Server running on http://{}", config.server_address());
    info!("📡 Sessions available at ws://{}/<session>", config.server_address());
    info!("📚 Swagger UI available at http://{}/api/swagger", config.server_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .expect("Server failed to start");

    // Upgraded connections outlive the HTTP server; let them finish closing.
    connections.close();
    info!("Waiting for {} connection(s) to close", connections.len());
    connections.wait().await;

    info!("Exit");
}

/// Wait for Ctrl-C, then close every live connection.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    shutdown.cancel();
}
