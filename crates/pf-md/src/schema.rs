//! Per-exchange wire schema.
//!
//! An exchange provider is the generic [`StreamingProvider`] parameterized by
//! one [`WireSchema`]: how pairs are named on the exchange, what the
//! subscription requests look like, and how an inbound text frame is
//! classified. Classification is by content; the exchange sends no type tag
//! common to every message, so implementations try each known shape in turn
//! and check its channel field before trusting it.
//!
//! [`StreamingProvider`]: crate::provider::StreamingProvider

use pf_core::ws::Frame;
use pf_core::{CandleRow, CurrencyPair, FeedError, TickerObservation};

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketEvent {
    /// Ticker rows, each naming its own instrument.
    Tickers(Vec<TickerObservation>),
    /// Candle rows for the instrument named by the envelope.
    Candles { instrument: String, rows: Vec<CandleRow> },
    /// Reply to our keepalive probe.
    KeepaliveAck,
}

/// Exchange-specific naming, requests and message classification.
pub trait WireSchema: Send + Sync + 'static {
    /// Provider name used in logs and errors, e.g. `"okx"`.
    fn name(&self) -> &'static str;

    /// Default public market-data endpoint.
    fn endpoint(&self) -> &'static str;

    /// Exchange instrument id for `pair`. Must be injective over the pairs in use.
    fn instrument_id(&self, pair: &CurrencyPair) -> String;

    /// Subscription request for the ticker channel.
    fn ticker_subscription(&self, instruments: &[String]) -> Result<String, FeedError>;

    /// Subscription request for the candle channel.
    fn candle_subscription(&self, instruments: &[String]) -> Result<String, FeedError>;

    /// Keepalive probe frame.
    fn keepalive(&self) -> Frame;

    /// Classify a text frame. `None` for anything outside the known shapes
    /// (acks, errors, notices); those are expected traffic, not failures.
    fn classify(&self, text: &str) -> Option<MarketEvent>;
}
