//! Market observations cached per instrument, and the numeric price values
//! produced from them at query time.
//!
//! Exchanges send prices and volumes as decimal strings. Observations keep
//! those strings untouched; conversion to `f64` happens when a consumer asks
//! for prices, so a malformed field is reported to that consumer instead of
//! being silently dropped on ingest.

use crate::error::FeedError;

// ---------------------------------------------------------------------------
// Observations (cached, exchange strings)
// ---------------------------------------------------------------------------

/// Latest ticker for one instrument. Last write wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerObservation {
    /// Exchange instrument id, e.g. `BTC-USDT`.
    pub instrument: String,
    /// Last traded price.
    pub last: String,
    /// Rolling 24h volume.
    pub volume_24h: String,
}

/// One decoded candle row, before its timestamp has been validated.
///
/// Candle rows arrive as positional arrays; exchange schemas pick the
/// timestamp, close and volume columns out into this fixed shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandleRow {
    pub timestamp: String,
    pub close: String,
    pub volume: String,
}

impl CandleRow {
    /// Epoch-millisecond timestamp, or `None` if the column is not an integer.
    pub fn timestamp_ms(&self) -> Option<i64> {
        self.timestamp.trim().parse().ok()
    }
}

/// A cached candle for one instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandleObservation {
    pub instrument: String,
    pub close: String,
    pub volume: String,
    /// Candle open time, epoch milliseconds.
    pub timestamp_ms: i64,
}

// ---------------------------------------------------------------------------
// Prices (consumer-facing, numeric)
// ---------------------------------------------------------------------------

/// Latest price and 24h volume of a pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickerPrice {
    pub price: f64,
    pub volume: f64,
}

/// Close price and volume of one candle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandlePrice {
    pub price: f64,
    pub volume: f64,
    pub timestamp_ms: i64,
}

impl TickerObservation {
    /// Convert the cached strings into a [`TickerPrice`].
    pub fn to_ticker_price(&self, provider: &str) -> Result<TickerPrice, FeedError> {
        Ok(TickerPrice {
            price: parse_decimal(provider, &self.instrument, "last", &self.last)?,
            volume: parse_decimal(provider, &self.instrument, "volume", &self.volume_24h)?,
        })
    }
}

impl CandleObservation {
    /// Convert the cached strings into a [`CandlePrice`].
    pub fn to_candle_price(&self, provider: &str) -> Result<CandlePrice, FeedError> {
        Ok(CandlePrice {
            price: parse_decimal(provider, &self.instrument, "close", &self.close)?,
            volume: parse_decimal(provider, &self.instrument, "volume", &self.volume)?,
            timestamp_ms: self.timestamp_ms,
        })
    }
}

/// Parse an exchange decimal string, naming the offending field on failure.
fn parse_decimal(
    provider: &str,
    instrument: &str,
    field: &str,
    raw: &str,
) -> Result<f64, FeedError> {
    match fast_float2::parse::<f64, _>(raw.trim()) {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(FeedError::Parse(format!("{provider}: invalid {field} '{raw}' for {instrument}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticker(last: &str, vol: &str) -> TickerObservation {
        TickerObservation {
            instrument: "BTC-USDT".into(),
            last: last.into(),
            volume_24h: vol.into(),
        }
    }

    #[test]
    fn ticker_price_parses_strings() {
        let price = ticker("50000.5", "100").to_ticker_price("okx").unwrap();
        assert_eq!(price.price, 50000.5);
        assert_eq!(price.volume, 100.0);
    }

    #[test]
    fn ticker_price_rejects_garbage() {
        let err = ticker("n/a", "100").to_ticker_price("okx").unwrap_err();
        assert!(matches!(err, FeedError::Parse(ref m) if m.contains("last")));
        assert!(ticker("1", "").to_ticker_price("okx").is_err());
        assert!(ticker("inf", "1").to_ticker_price("okx").is_err());
    }

    #[test]
    fn candle_price_keeps_timestamp() {
        let candle = CandleObservation {
            instrument: "ETH-USDT".into(),
            close: "3000.25".into(),
            volume: "12.5".into(),
            timestamp_ms: 1_700_000_000_000,
        };
        let price = candle.to_candle_price("okx").unwrap();
        assert_eq!(price.price, 3000.25);
        assert_eq!(price.volume, 12.5);
        assert_eq!(price.timestamp_ms, 1_700_000_000_000);
    }

    #[test]
    fn candle_row_timestamp() {
        let row = CandleRow {
            timestamp: "1700000000000".into(),
            close: "1".into(),
            volume: "2".into(),
        };
        assert_eq!(row.timestamp_ms(), Some(1_700_000_000_000));
        let bad = CandleRow { timestamp: "soon".into(), ..row };
        assert_eq!(bad.timestamp_ms(), None);
    }
}
