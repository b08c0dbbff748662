//! OKX v5 public WebSocket messages.
//!
//! REF: <https://www.okx.com/docs-v5/en/#websocket-api-public-channel>
//!
//! Ticker pushes carry an array of objects; candle pushes carry an array of
//! positional string arrays (`[ts, o, h, l, c, vol, volCcy, volCcyQuote, confirm]`).
//! Neither has a top-level type tag, so [`classify`] decodes each shape in
//! turn and checks `arg.channel` before accepting it.

use pf_core::{CandleRow, FeedError, TickerObservation};
use serde::{Deserialize, Serialize};

use crate::schema::MarketEvent;

pub const TICKERS_CHANNEL: &str = "tickers";
pub const CANDLE_1M_CHANNEL: &str = "candle1m";

/// Application-level keepalive probe.
pub const PING: &str = "ping";

/// OKX answers a [`PING`] text frame with this text.
pub const PONG: &str = "pong";

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// One `{channel, instId}` subscription argument.
#[derive(Debug, Clone, Serialize)]
pub struct OkxSubscriptionTopic<'a> {
    pub channel: &'a str,
    #[serde(rename = "instId")]
    pub inst_id: &'a str,
}

/// `{"op": "subscribe", "args": [...]}`
#[derive(Debug, Clone, Serialize)]
pub struct OkxSubscriptionMsg<'a> {
    pub op: &'a str,
    pub args: Vec<OkxSubscriptionTopic<'a>>,
}

/// Serialize a subscribe request for `channel` on every instrument.
pub fn build_subscribe(channel: &str, inst_ids: &[String]) -> Result<String, FeedError> {
    let msg = OkxSubscriptionMsg {
        op: "subscribe",
        args: inst_ids.iter().map(|id| OkxSubscriptionTopic { channel, inst_id: id }).collect(),
    };
    serde_json::to_string(&msg)
        .map_err(|e| FeedError::Subscription(format!("encode {channel} request: {e}")))
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// The `arg` envelope naming channel and instrument.
#[derive(Debug, Clone, Deserialize)]
pub struct OkxArg {
    pub channel: String,
    #[serde(rename = "instId", default)]
    pub inst_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OkxTickerRow {
    #[serde(rename = "instId")]
    pub inst_id: String,
    /// Last traded price.
    pub last: String,
    /// 24h volume in base currency.
    #[serde(rename = "vol24h")]
    pub vol_24h: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OkxTickerResponse {
    pub arg: OkxArg,
    pub data: Vec<OkxTickerRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OkxCandleResponse {
    pub arg: OkxArg,
    pub data: Vec<Vec<String>>,
}

/// Positional candle row with the columns this feed consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OkxCandleRow<'a> {
    fields: &'a [String],
}

impl<'a> OkxCandleRow<'a> {
    const TIMESTAMP: usize = 0;
    const CLOSE: usize = 4;
    const VOLUME: usize = 5;
    const MIN_ARITY: usize = Self::VOLUME + 1;

    /// `None` if the row is too short to hold every consumed column.
    pub fn new(fields: &'a [String]) -> Option<Self> {
        (fields.len() >= Self::MIN_ARITY).then_some(Self { fields })
    }

    pub fn timestamp(&self) -> &'a str {
        &self.fields[Self::TIMESTAMP]
    }

    pub fn close(&self) -> &'a str {
        &self.fields[Self::CLOSE]
    }

    pub fn volume(&self) -> &'a str {
        &self.fields[Self::VOLUME]
    }

    pub fn to_candle_row(&self) -> CandleRow {
        CandleRow {
            timestamp: self.timestamp().to_string(),
            close: self.close().to_string(),
            volume: self.volume().to_string(),
        }
    }
}

impl From<OkxTickerRow> for TickerObservation {
    fn from(row: OkxTickerRow) -> Self {
        Self { instrument: row.inst_id, last: row.last, volume_24h: row.vol_24h }
    }
}

/// Classify one inbound text frame.
pub fn classify(text: &str) -> Option<MarketEvent> {
    if text == PONG {
        return Some(MarketEvent::KeepaliveAck);
    }

    if let Ok(resp) = serde_json::from_str::<OkxTickerResponse>(text) {
        if resp.arg.channel == TICKERS_CHANNEL {
            return Some(MarketEvent::Tickers(resp.data.into_iter().map(Into::into).collect()));
        }
    }

    let resp = serde_json::from_str::<OkxCandleResponse>(text).ok()?;
    if resp.arg.channel != CANDLE_1M_CHANNEL {
        return None;
    }
    let rows = resp
        .data
        .iter()
        .filter_map(|fields| OkxCandleRow::new(fields))
        .map(|row| row.to_candle_row())
        .collect();
    Some(MarketEvent::Candles { instrument: resp.arg.inst_id, rows })
}
