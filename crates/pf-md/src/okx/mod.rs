//! OKX public market data — tickers and 1-minute candles.
//!
//! [`OkxProvider`] is the generic [`StreamingProvider`] over [`OkxSchema`].

pub mod messages;
pub mod naming;

use std::sync::Arc;

use pf_core::config::ProviderConfig;
use pf_core::ws::{Frame, WsConnector};
use pf_core::{CurrencyPair, FeedError};

use crate::provider::StreamingProvider;
use crate::schema::{MarketEvent, WireSchema};
use crate::session::SessionConfig;

pub const OKX_WS_URL: &str = "wss://ws.okx.com:8443/ws/v5/public";

/// OKX streaming price provider.
pub type OkxProvider = StreamingProvider<OkxSchema>;

/// OKX v5 public WebSocket schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct OkxSchema;

impl WireSchema for OkxSchema {
    fn name(&self) -> &'static str {
        "okx"
    }

    fn endpoint(&self) -> &'static str {
        OKX_WS_URL
    }

    fn instrument_id(&self, pair: &CurrencyPair) -> String {
        naming::to_okx_inst_id(pair)
    }

    fn ticker_subscription(&self, instruments: &[String]) -> Result<String, FeedError> {
        messages::build_subscribe(messages::TICKERS_CHANNEL, instruments)
    }

    fn candle_subscription(&self, instruments: &[String]) -> Result<String, FeedError> {
        messages::build_subscribe(messages::CANDLE_1M_CHANNEL, instruments)
    }

    fn keepalive(&self) -> Frame {
        Frame::Text(messages::PING.into())
    }

    fn classify(&self, text: &str) -> Option<MarketEvent> {
        messages::classify(text)
    }
}

/// Build an [`OkxProvider`] from its config entry.
pub async fn connect(
    config: &ProviderConfig,
    connector: Arc<dyn WsConnector>,
) -> Result<OkxProvider, FeedError> {
    let pairs = config.currency_pairs()?;
    let session = SessionConfig::from_provider_config(config, OkxSchema.endpoint());
    StreamingProvider::connect(OkxSchema, connector, session, &pairs).await
}
