//! Fraud Explorer API Server
//!
//! REST API for address fraud diagnostics
//!
//! Usage:
//!   cargo run --bin fraud_explorer_api
//!
//! Environment:
//!   PORT / FRAUD_EXPLORER_PORT - Server port (default: 8080)
//!   FRAUD_EXPLORER_HOST        - Server host (default: 0.0.0.0)
//!   FRAUD_EXPLORER_API_KEYS    - Comma-separated accepted X-API-Key values (optional)
//!   FLIPSIDE_API_KEY, SUPABASE_URL, SUPABASE_KEY - data sources (required)
//!   RUST_LOG                   - Log level (default: info)

use fraud_explorer::api::{create_router, start_cleanup_task, AppState};
use fraud_explorer::{ExplorerConfig, FraudExplorer, ServerConfig, TelemetryCollector};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    print_banner();

    let config = ExplorerConfig::from_env()?;
    let server = ServerConfig::from_env()?;

    let telemetry = Arc::new(TelemetryCollector::new());
    let explorer = Arc::new(FraudExplorer::from_config(&config, telemetry.clone())?);

    // Background task: sweep expired cache entries every 60 seconds
    let sweeper = explorer.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = sweeper.cleanup_caches();
            if removed > 0 {
                info!("🧹 Cache cleanup: {} expired entries removed", removed);
            }
        }
    });

    start_cleanup_task();
    info!("🧹 Background cleanup tasks started");

    if server.api_keys.is_empty() {
        warn!("⚠️ FRAUD_EXPLORER_API_KEYS not set, API is open (rate limited)");
    } else {
        info!("🔐 API key auth enabled ({} keys)", server.api_keys.len());
    }

    let state = Arc::new(AppState::new(explorer, &server));
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", server.host, server.port).parse()?;

    info!("🚀 Fraud Explorer API starting on http://{}", addr);
    info!("");
    info!("Endpoints:");
    info!("  POST   /v1/analyze        - Assess one address");
    info!("  POST   /v1/analyze/batch  - Assess up to 20 addresses");
    info!("  GET    /v1/example        - Example report");
    info!("  GET    /v1/chains         - Supported networks");
    info!("  GET    /v1/history        - Search history");
    info!("  DELETE /v1/history        - Clear search history");
    info!("  GET    /v1/stats          - Scan statistics");
    info!("  GET    /v1/health         - Health check");
    info!("");
    info!("Press Ctrl+C for graceful shutdown");

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("🛑 Shutdown signal received");
    let stats = telemetry.stats();
    println!("{}", stats.summary());
    debug!("📊 Final telemetry: {}", stats.to_json());
    info!("👋 Fraud Explorer API shutdown complete");

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ╔══════════════════════════════════════════════════════════════╗
    ║                                                              ║
    ║              🔎  F R A U D   E X P L O R E R                 ║
    ║                                                              ║
    ║         Address fraud diagnostics  -  REST API               ║
    ║                                                              ║
    ╚══════════════════════════════════════════════════════════════╝
    "#
    );
}
