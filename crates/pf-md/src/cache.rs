//! Market state shared between the receive loop and query callers.
//!
//! A single `parking_lot::RwLock` guards tickers, candles and the
//! subscription set. Writers are only ever the receive loop (and subscription
//! bookkeeping); readers copy out what they need and release the lock before
//! converting anything.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use ahash::AHashMap;
use parking_lot::RwLock;
use pf_core::time_util;
use pf_core::{CandleObservation, CandleRow, CurrencyPair, FeedError, TickerObservation};

/// Concurrency-safe ticker / candle / subscription cache for one provider.
pub struct MarketCache {
    provider: String,
    retention: Duration,
    inner: RwLock<CacheInner>,
}

#[derive(Default)]
struct CacheInner {
    /// instrument id → latest ticker
    tickers: AHashMap<String, TickerObservation>,
    /// instrument id → candles, most recent first
    candles: AHashMap<String, VecDeque<CandleObservation>>,
    /// canonical pair string → pair
    subscribed: BTreeMap<String, CurrencyPair>,
}

impl MarketCache {
    /// Create an empty cache retaining candles for `retention`.
    pub fn new(provider: &str, retention: Duration) -> Self {
        Self {
            provider: provider.to_string(),
            retention,
            inner: RwLock::new(CacheInner::default()),
        }
    }

    /// Replace the stored ticker for `observation.instrument`.
    pub fn upsert_ticker(&self, observation: TickerObservation) {
        self.inner.write().tickers.insert(observation.instrument.clone(), observation);
    }

    /// Prepend a candle row for `instrument` and prune everything at or
    /// before `now - retention`.
    ///
    /// Returns `false` (and leaves the cache untouched) if the row's
    /// timestamp is not an integer.
    pub fn upsert_candle(&self, instrument: &str, row: &CandleRow) -> bool {
        self.upsert_candle_at(instrument, row, time_util::now_ms())
    }

    fn upsert_candle_at(&self, instrument: &str, row: &CandleRow, now_ms: i64) -> bool {
        let Some(timestamp_ms) = row.timestamp_ms() else {
            return false;
        };
        let stale_before = time_util::lookback_ms(now_ms, self.retention);
        let candle = CandleObservation {
            instrument: instrument.to_string(),
            close: row.close.clone(),
            volume: row.volume.clone(),
            timestamp_ms,
        };

        let mut inner = self.inner.write();
        let candles = inner.candles.entry(instrument.to_string()).or_default();
        candles.push_front(candle);
        candles.retain(|c| c.timestamp_ms > stale_before);
        true
    }

    /// Latest ticker for `instrument`.
    pub fn read_ticker(&self, instrument: &str) -> Result<TickerObservation, FeedError> {
        self.inner
            .read()
            .tickers
            .get(instrument)
            .cloned()
            .ok_or_else(|| FeedError::not_found(&self.provider, instrument))
    }

    /// Retained candles for `instrument`, most recent first.
    ///
    /// An instrument whose candles were all pruned yields an empty vector;
    /// one never observed yields [`FeedError::NotFound`].
    pub fn read_candles(&self, instrument: &str) -> Result<Vec<CandleObservation>, FeedError> {
        self.inner
            .read()
            .candles
            .get(instrument)
            .map(|c| c.iter().cloned().collect())
            .ok_or_else(|| FeedError::not_found(&self.provider, instrument))
    }

    /// Add `pairs` to the subscription set. Idempotent.
    pub fn record_subscription(&self, pairs: &[CurrencyPair]) {
        let mut inner = self.inner.write();
        for pair in pairs {
            inner.subscribed.insert(pair.to_string(), pair.clone());
        }
    }

    /// Snapshot of the subscription set, ordered by canonical key.
    pub fn list_subscriptions(&self) -> Vec<CurrencyPair> {
        self.inner.read().subscribed.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE_MS: i64 = 60_000;

    fn cache() -> MarketCache {
        MarketCache::new("okx", Duration::from_secs(600))
    }

    fn row(ts: i64, close: &str) -> CandleRow {
        CandleRow { timestamp: ts.to_string(), close: close.into(), volume: "1".into() }
    }

    fn timestamps(cache: &MarketCache, inst: &str) -> Vec<i64> {
        cache.read_candles(inst).unwrap().iter().map(|c| c.timestamp_ms).collect()
    }

    #[test]
    fn ticker_read_your_write() {
        let cache = cache();
        let obs = TickerObservation {
            instrument: "BTC-USDT".into(),
            last: "50000.5".into(),
            volume_24h: "100".into(),
        };
        cache.upsert_ticker(obs.clone());
        assert_eq!(cache.read_ticker("BTC-USDT").unwrap(), obs);

        let newer = TickerObservation { last: "50001".into(), ..obs };
        cache.upsert_ticker(newer.clone());
        assert_eq!(cache.read_ticker("BTC-USDT").unwrap(), newer);
    }

    #[test]
    fn unseen_instrument_is_not_found() {
        let cache = cache();
        assert!(matches!(cache.read_ticker("ETH-USDT"), Err(FeedError::NotFound { .. })));
        assert!(matches!(cache.read_candles("ETH-USDT"), Err(FeedError::NotFound { .. })));
    }

    #[test]
    fn candles_keep_only_retention_window() {
        let cache = cache();
        let t0 = 1_700_000_000_000;
        // one candle per minute for 15 minutes, each inserted at its own time
        for i in 0..15 {
            let ts = t0 + i * MINUTE_MS;
            assert!(cache.upsert_candle_at("BTC-USDT", &row(ts, "1"), ts));
        }
        let latest = t0 + 14 * MINUTE_MS;
        let expected: Vec<i64> = (0..15)
            .rev()
            .map(|i| t0 + i * MINUTE_MS)
            .filter(|ts| *ts > latest - 10 * MINUTE_MS)
            .collect();
        assert_eq!(expected.len(), 10);
        assert_eq!(timestamps(&cache, "BTC-USDT"), expected);
    }

    #[test]
    fn malformed_timestamp_is_noop() {
        let cache = cache();
        let now = 1_700_000_000_000;
        cache.upsert_candle_at("BTC-USDT", &row(now, "10"), now);
        let before = cache.read_candles("BTC-USDT").unwrap();

        let bad = CandleRow {
            timestamp: "12:00".into(),
            close: "11".into(),
            volume: "1".into(),
        };
        assert!(!cache.upsert_candle_at("BTC-USDT", &bad, now + 1));
        assert_eq!(cache.read_candles("BTC-USDT").unwrap(), before);

        // a bad first row does not create the key either
        assert!(!cache.upsert_candle_at("ETH-USDT", &bad, now));
        assert!(cache.read_candles("ETH-USDT").is_err());
    }

    #[test]
    fn stale_row_leaves_present_but_empty() {
        let cache = cache();
        let now = 1_700_000_000_000;
        assert!(cache.upsert_candle_at("BTC-USDT", &row(now - 11 * MINUTE_MS, "1"), now));
        assert!(cache.read_candles("BTC-USDT").unwrap().is_empty());
    }

    #[test]
    fn candles_are_per_instrument() {
        let cache = cache();
        let now = 1_700_000_000_000;
        cache.upsert_candle_at("BTC-USDT", &row(now, "1"), now);
        cache.upsert_candle_at("ETH-USDT", &row(now - MINUTE_MS, "2"), now);
        assert_eq!(timestamps(&cache, "BTC-USDT"), vec![now]);
        assert_eq!(timestamps(&cache, "ETH-USDT"), vec![now - MINUTE_MS]);
    }

    #[test]
    fn subscriptions_are_idempotent_and_sorted() {
        let cache = cache();
        let btc = CurrencyPair::new("BTC", "USDT");
        let eth = CurrencyPair::new("ETH", "USDT");
        cache.record_subscription(&[eth.clone(), btc.clone()]);
        cache.record_subscription(&[btc.clone()]);
        assert_eq!(cache.list_subscriptions(), vec![btc, eth]);
    }

    #[test]
    fn pairs_sharing_concatenated_legs_are_distinct() {
        let cache = cache();
        let btc = CurrencyPair::new("BTC", "USDT");
        let btcu = CurrencyPair::new("BTCU", "SDT");
        cache.record_subscription(&[btc.clone()]);
        cache.record_subscription(&[btcu.clone()]);
        assert_eq!(cache.list_subscriptions(), vec![btc, btcu]);
    }
}
