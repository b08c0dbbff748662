//! # pf-md
//!
//! Streaming market-data providers.
//!
//! ## Architecture
//!
//! Each exchange supplies a [`schema::WireSchema`] (instrument naming, wire
//! messages, content-based classification). The generic
//! [`provider::StreamingProvider`] composes it with the shared pieces:
//!
//! ```text
//! StreamingProvider ──► Session (one WS connection, liveness, reconnect)
//!                   ──► receive loop task (read, classify, apply)
//!                   ──► MarketCache (RwLock-guarded tickers / candles / subscriptions)
//! ```
//!
//! Queries never touch the network: they read the cache under its read lock.
//!
//! ## Modules
//!
//! - [`cache`] — concurrency-safe ticker/candle/subscription state
//! - [`schema`] — per-exchange wire schema trait
//! - [`session`] — connection lifecycle (connect, subscribe, keepalive, reconnect)
//! - [`receive_loop`] — background task driving all cache mutations
//! - [`provider`] — the façade implementing [`PriceProvider`]
//! - [`okx`] — OKX public market-data instantiation
//! - [`registry`] — build providers from configuration

pub mod cache;
pub mod okx;
pub mod provider;
pub mod receive_loop;
pub mod registry;
pub mod schema;
pub mod session;

use std::collections::HashMap;

use async_trait::async_trait;
use pf_core::{CandlePrice, CurrencyPair, FeedError, TickerPrice};

/// Upward interface consumed by price aggregation.
///
/// Returned maps are keyed by the pair's canonical string form (`BTC/USDT`).
/// Queries fail fast: the first pair without cached data aborts the whole call
/// with a retryable [`FeedError::NotFound`].
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Subscribe `pairs` to the ticker and candle channels.
    ///
    /// Pairs are only recorded as subscribed once both requests were written.
    async fn subscribe(&self, pairs: &[CurrencyPair]) -> Result<(), FeedError>;

    /// Latest ticker price per pair.
    fn get_ticker_prices(
        &self,
        pairs: &[CurrencyPair],
    ) -> Result<HashMap<String, TickerPrice>, FeedError>;

    /// Retained candles per pair, most recent first.
    fn get_candle_prices(
        &self,
        pairs: &[CurrencyPair],
    ) -> Result<HashMap<String, Vec<CandlePrice>>, FeedError>;

    /// Pairs currently recorded as subscribed.
    fn subscribed_pairs(&self) -> Vec<CurrencyPair>;

    /// Stop the background task and close the connection.
    async fn stop(&self);
}
