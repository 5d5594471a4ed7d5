use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::arg;
use clap::command;
use clap::Parser;
use ms_token_agent::config::loader;
use ms_token_agent::gate::auth_gate::AuthGate;
use ms_token_agent::observability::service_resources_metrics::collect_process_metrics;
use ms_token_agent::server;
use ms_token_agent::utils::logging;
use ms_token_agent::utils::logging::LogLevel;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// settings YAML; built-in defaults when omitted
    #[arg(short, long, env = "CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Read args, load YAML settings
    // -------------------------------

    let args = Args::parse();
    let service_config = loader::load(args.config.as_deref()).await?;
    logging::run(&service_config, args.log_level);
    let settings = &service_config.settings;

    // -------------------------------
    // 2. Build the auth gate
    //
    // credentials from MS_* env vars
    // exchanger -> cache -> gate
    // -------------------------------

    let gate = AuthGate::from_env(settings).context("cannot configure token exchange")?;

    // -------------------------------
    // 3. Warm the cache, a failure here is not fatal
    // -------------------------------

    match gate.current_bearer_token().await {
        Ok(_) => info!("initial token acquired"),
        Err(e) => warn!(reason = e.reason(), "initial token fetch failed: {}", e),
    }

    // -------------------------------
    // 4. Scrape system resources consumption metrics
    // -------------------------------

    let is_metrics_enabled = settings.metrics.is_enabled;
    tokio::spawn(async move {
        if let Err(e) = collect_process_metrics(is_metrics_enabled).await {
            warn!("process metrics disabled: {}", e);
        }
    });

    // -------------------------------
    // 5. Serve token + metrics endpoints until shutdown
    // -------------------------------

    info!("Service starting...");
    server::server::start(settings, gate).await
}
