//! # pf-runner
//!
//! Entry point for the price feeder.
//!
//! Loads a JSON configuration file, starts one streaming provider per
//! configured exchange, periodically logs the cached prices of every
//! subscribed pair, and stops the providers on Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! pf-runner config.json --log-level info
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use pf_core::FeedError;
use pf_md::PriceProvider;
use tracing::{error, info, warn};

/// Exchange price feeder.
#[derive(Parser)]
#[command(name = "pf-runner", about = "Streaming exchange price feeder")]
struct Cli {
    /// Configuration file path (JSON).
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(short, long)]
    log_level: Option<String>,

    /// Optional log directory for file output. Overrides the config file.
    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let config = pf_core::config::load_config(&cli.config)?;

    // 2. Initialize logging
    let log_level = cli
        .log_level
        .or_else(|| config.log_level())
        .unwrap_or_else(|| "info".to_string());
    let log_dir = cli.log_dir.or_else(|| config.log_path());
    let module_name = config.module_name();
    let _log_guard = pf_core::logging::init_logging(
        &log_level,
        log_dir.as_deref(),
        &module_name,
        config.log_json(),
    );

    info!(
        "{module_name} starting, config={}, log_level={log_level}, {} provider(s)",
        cli.config.display(),
        config.providers.len()
    );

    // 3. Start one provider per entry
    let mut providers: Vec<Box<dyn PriceProvider>> = Vec::new();
    for (idx, provider_config) in config.providers.iter().enumerate() {
        match pf_md::registry::create_provider(provider_config).await {
            Ok(provider) => {
                info!(
                    "provider[{idx}]: started '{}' with {} pair(s)",
                    provider.name(),
                    provider.subscribed_pairs().len()
                );
                providers.push(provider);
            }
            Err(e) => {
                error!("provider[{idx}]: failed to start '{}': {e:#}", provider_config.exchange);
            }
        }
    }

    if providers.is_empty() {
        anyhow::bail!("no provider could be started");
    }
    info!("all {} provider(s) running, press Ctrl+C to stop", providers.len());

    // 4. Report until shutdown
    let mut report = tokio::time::interval(config.report_interval());
    report.tick().await;
    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res?;
                info!("shutdown signal received");
                break;
            }
            _ = report.tick() => {
                for provider in &providers {
                    report_prices(provider.as_ref());
                }
            }
        }
    }

    // 5. Stop all providers
    for provider in &providers {
        info!("stopping provider '{}'", provider.name());
        provider.stop().await;
    }

    info!("all providers stopped");
    Ok(())
}

fn report_prices(provider: &dyn PriceProvider) {
    let pairs = provider.subscribed_pairs();
    if pairs.is_empty() {
        return;
    }

    match provider.get_ticker_prices(&pairs) {
        Ok(prices) => {
            for pair in &pairs {
                if let Some(p) = prices.get(&pair.to_string()) {
                    info!("[{}] {pair} last={} vol24h={}", provider.name(), p.price, p.volume);
                }
            }
        }
        Err(e @ FeedError::NotFound { .. }) => warn!("[{}] prices not ready: {e}", provider.name()),
        Err(e) => error!("[{}] ticker query failed: {e}", provider.name()),
    }

    match provider.get_candle_prices(&pairs) {
        Ok(candles) => {
            for (pair, rows) in &candles {
                if let Some(latest) = rows.first() {
                    info!(
                        "[{}] {pair} {} candle(s), latest close={} at {}",
                        provider.name(),
                        rows.len(),
                        latest.price,
                        latest.timestamp_ms
                    );
                }
            }
        }
        Err(e @ FeedError::NotFound { .. }) => {
            warn!("[{}] candles not ready: {e}", provider.name())
        }
        Err(e) => error!("[{}] candle query failed: {e}", provider.name()),
    }
}
