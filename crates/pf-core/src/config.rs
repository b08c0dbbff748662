//! Configuration parsing for the price feeder.
//!
//! The runner reads a single JSON config file. The top-level structure holds
//! logging metadata and a `providers` array where each entry describes one
//! exchange provider instance.
//!
//! # Example config
//!
//! ```json
//! {
//!   "feeder": { "module_name": "price_feeder", "log_path": "/tmp/log" },
//!   "providers": [{
//!     "exchange": "okx",
//!     "pairs": ["BTC/USDT", "ETH/USDT"],
//!     "liveness_timeout_sec": 28,
//!     "candle_retention_sec": 600
//!   }]
//! }
//! ```

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::FeedError;
use crate::types::CurrencyPair;

/// Default liveness bound; OKX drops sessions idle for 30 seconds.
pub const DEFAULT_LIVENESS_TIMEOUT_SEC: u64 = 28;
/// Default keepalive interval, kept below the liveness bound.
pub const DEFAULT_PING_INTERVAL_SEC: u64 = 25;
/// Default read poll interval.
pub const DEFAULT_READ_POLL_MS: u64 = 50;
/// Default candle retention window (10 minutes).
pub const DEFAULT_CANDLE_RETENTION_SEC: u64 = 600;

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Process metadata (name, logging, reporting).
    pub feeder: Option<FeederMeta>,

    /// One entry per exchange provider.
    pub providers: Vec<ProviderConfig>,
}

impl AppConfig {
    /// Validate every provider entry.
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.providers.is_empty() {
            return Err(FeedError::Config("no providers configured".into()));
        }
        self.providers.iter().try_for_each(ProviderConfig::validate)
    }

    pub fn module_name(&self) -> String {
        self.feeder
            .as_ref()
            .and_then(|m| m.module_name.clone())
            .unwrap_or_else(|| "price_feeder".to_string())
    }

    pub fn log_path(&self) -> Option<String> {
        self.feeder.as_ref().and_then(|m| m.log_path.clone())
    }

    pub fn log_level(&self) -> Option<String> {
        self.feeder.as_ref().and_then(|m| m.log_level.clone())
    }

    pub fn log_json(&self) -> bool {
        self.feeder.as_ref().and_then(|m| m.log_json).unwrap_or(false)
    }

    /// How often the runner logs the current price snapshot (default: 10s).
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.feeder.as_ref().and_then(|m| m.report_interval_sec).unwrap_or(10))
    }
}

/// Process metadata block.
#[derive(Debug, Clone, Deserialize)]
pub struct FeederMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
    pub log_level: Option<String>,
    pub log_json: Option<bool>,
    pub report_interval_sec: Option<u64>,
}

/// A single exchange provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Exchange identifier, e.g. `"okx"`.
    pub exchange: String,

    /// Pairs subscribed at startup (`"BTC/USDT"`, `"ETH-USDT"`, ...).
    #[serde(default)]
    pub pairs: Vec<String>,

    /// Override of the exchange's public WebSocket endpoint.
    pub ws_url: Option<String>,

    /// Keepalive interval in seconds. `0` disables periodic keepalives.
    pub ping_interval_sec: Option<u64>,

    /// Reconnect if nothing is read for this many seconds.
    pub liveness_timeout_sec: Option<u64>,

    /// Read poll interval in milliseconds.
    pub read_poll_ms: Option<u64>,

    /// Candle retention window in seconds.
    pub candle_retention_sec: Option<u64>,

    /// Extra HTTP headers for the WebSocket handshake.
    #[serde(default)]
    pub extra_headers: HashMap<String, String>,
}

impl ProviderConfig {
    /// A config for `exchange` with every optional field at its default.
    pub fn new(exchange: &str) -> Self {
        Self {
            exchange: exchange.to_string(),
            pairs: Vec::new(),
            ws_url: None,
            ping_interval_sec: None,
            liveness_timeout_sec: None,
            read_poll_ms: None,
            candle_retention_sec: None,
            extra_headers: HashMap::new(),
        }
    }

    /// Parsed startup pairs.
    pub fn currency_pairs(&self) -> Result<Vec<CurrencyPair>, FeedError> {
        self.pairs.iter().map(|p| p.parse()).collect()
    }

    /// Keepalive interval, `None` when disabled.
    pub fn effective_ping_interval(&self) -> Option<Duration> {
        match self.ping_interval_sec.unwrap_or(DEFAULT_PING_INTERVAL_SEC) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn effective_liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout_sec.unwrap_or(DEFAULT_LIVENESS_TIMEOUT_SEC))
    }

    pub fn effective_read_poll(&self) -> Duration {
        Duration::from_millis(self.read_poll_ms.unwrap_or(DEFAULT_READ_POLL_MS))
    }

    pub fn effective_candle_retention(&self) -> Duration {
        Duration::from_secs(self.candle_retention_sec.unwrap_or(DEFAULT_CANDLE_RETENTION_SEC))
    }

    /// Check the entry for values the provider cannot run with.
    pub fn validate(&self) -> Result<(), FeedError> {
        if self.exchange.trim().is_empty() {
            return Err(FeedError::Config("provider entry without exchange".into()));
        }
        let invalid = |msg: String| FeedError::Config(format!("{}: {msg}", self.exchange));
        if let Some(ref raw) = self.ws_url {
            let url = url::Url::parse(raw)
                .map_err(|e| invalid(format!("invalid ws_url '{raw}': {e}")))?;
            if !matches!(url.scheme(), "ws" | "wss") {
                return Err(invalid("ws_url must be ws:// or wss://".into()));
            }
        }
        let liveness = self.effective_liveness_timeout();
        if liveness.is_zero() {
            return Err(invalid("liveness_timeout_sec must be > 0".into()));
        }
        if let Some(ping) = self.effective_ping_interval() {
            if ping >= liveness {
                return Err(invalid(format!(
                    "ping interval {ping:?} must be below liveness timeout {liveness:?}"
                )));
            }
        }
        self.currency_pairs()?;
        Ok(())
    }
}

/// Load and parse a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
