//! Headless trading server.
//!
//! Runs the scheduler, strategy evaluation, and alerting without a UI or
//! inbound HTTP server. Metrics are pushed via structured JSON logs to
//! stdout (see `infrastructure::observability::MetricsReporter`).
//!
//! # Environment variables
//! See `config::Config::from_env` for the full list; all have defaults.

use anyhow::Result;
use intraday_core::application::bootstrap::BootstrapData;
use intraday_core::application::system::Application;
use intraday_core::config::Config;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("intraday-core {} starting", env!("CARGO_PKG_VERSION"));
    info!("mode: headless (no UI, no inbound HTTP server)");

    let config = Config::from_env()?;
    info!(observability_enabled = config.observability_enabled, "configuration loaded");

    // A real deployment populates this from the master-data process
    // (daily ingest / universe filter / minute ingest); those steps are
    // out of this core's scope, so the headless binary starts empty and
    // relies on a caller to seed stores before anything trades.
    let app = Application::build(config, BootstrapData::empty()).await?;

    let handle = app.start().await?;
    info!("trading system running; press Ctrl+C to shut down");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    handle.shutdown();

    Ok(())
}
