//! # sigtrade-runner
//!
//! Main entry point for the signal trading service.
//!
//! Loads a JSON configuration file, connects the Bitget client, opens the
//! active-trade store and settings under the data directory, starts the
//! position monitor, and serves the HTTP API until Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! sigtrade-runner config.json --log-level info
//! ```

mod http;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sigtrade_engine::TradeManager;
use sigtrade_engine::settings::FileSettings;
use sigtrade_engine::store::ActiveTradeStore;
use sigtrade_td::MarketApi;
use sigtrade_td::bitget::BitgetTd;
use sigtrade_td::bitget::config::BitgetTdConfig;
use tracing::{info, warn};

/// Signal-driven futures trading service.
#[derive(Parser)]
#[command(name = "sigtrade-runner", about = "Signal-driven futures trading service")]
struct Cli {
    /// Configuration file path (JSON).
    #[arg(default_value = "config.json")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output (overrides `app.log_path`).
    #[arg(long)]
    log_dir: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,

    /// HTTP port (overrides `server.port`).
    #[arg(short, long, env = "SIGTRADE_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let config = sigtrade_core::config::load_config(&cli.config)?;

    // 2. Initialize logging
    let log_dir = cli.log_dir.clone().or_else(|| config.log_path());
    sigtrade_core::logging::init_logging(&cli.log_level, log_dir.as_deref(), &config.module_name(), cli.json_logs);

    info!(
        "sigtrade-runner starting, config={} test_mode={} data_dir={}",
        cli.config.display(),
        config.api.test_mode,
        config.trading.data_dir.display(),
    );

    // 3. Exchange client
    let td = BitgetTd::new(BitgetTdConfig::from_api(&config.api)).context("failed to create Bitget client")?;
    let api: Arc<dyn MarketApi> = Arc::new(td);

    if let Err(e) = api.set_position_mode(&config.trading.position_mode).await {
        warn!("position mode {} not applied: {e}", config.trading.position_mode);
    }

    // 4. Local state
    let store = ActiveTradeStore::open(&config.trading.data_dir)
        .await
        .with_context(|| format!("failed to open trade store in {}", config.trading.data_dir.display()))?;
    let settings = FileSettings::new(&config.trading.data_dir);
    let manager = TradeManager::new(api, Arc::new(store), Arc::new(settings));
    info!("{} active trade(s) restored", manager.active_trades().await.len());

    // 5. Position monitor
    let monitor = config
        .monitor
        .enabled
        .then(|| manager.monitor(Duration::from_secs(config.monitor.interval_secs)).spawn());
    if monitor.is_none() {
        info!("position monitor disabled");
    }

    // 6. HTTP API
    let state = Arc::new(http::AppState {
        manager,
        test_mode: config.api.test_mode,
    });
    let app = http::router(state, config.server.static_dir.as_deref());

    let host = config.server.host.parse::<std::net::IpAddr>().with_context(|| format!("invalid server.host {}", config.server.host))?;
    let addr = SocketAddr::new(host, cli.port.unwrap_or(config.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("failed to bind {addr}"))?;
    info!("HTTP API listening on http://{addr}, press Ctrl+C to stop");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    // 7. Stop background work
    if let Some(handle) = monitor {
        handle.abort();
    }
    info!("sigtrade-runner stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
