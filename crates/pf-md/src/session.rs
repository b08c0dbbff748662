//! Connection lifecycle: the single WebSocket connection, its subscriptions,
//! keepalive probes, and the reconnect protocol.
//!
//! ```text
//! Connecting ──► Connected ──(liveness expiry)──► Reconnecting ──► Connected
//!                                                       │
//!                                                       └──(dial failed)──► Disconnected
//! ```
//!
//! The session is owned by the receive loop task; nothing else touches the
//! connection handle.

use std::sync::Arc;
use std::time::Duration;

use pf_core::config::ProviderConfig;
use pf_core::ws::{Frame, WsConnector, WsStream};
use pf_core::{CurrencyPair, FeedError};
use tracing::{debug, info, warn};

use crate::cache::MarketCache;
use crate::schema::WireSchema;

/// Timing and endpoint settings for one provider session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket endpoint.
    pub ws_url: String,
    /// Periodic keepalive interval; `None` sends probes only after read errors.
    pub ping_interval: Option<Duration>,
    /// Reconnect when nothing has been read for this long.
    pub liveness_timeout: Duration,
    /// Pause after a failed read before reading again.
    pub read_poll_interval: Duration,
    /// Candle retention window.
    pub candle_retention: Duration,
}

impl SessionConfig {
    /// Resolve a [`ProviderConfig`], falling back to `default_url`.
    pub fn from_provider_config(cfg: &ProviderConfig, default_url: &str) -> Self {
        Self {
            ws_url: cfg.ws_url.clone().unwrap_or_else(|| default_url.to_string()),
            ping_interval: cfg.effective_ping_interval(),
            liveness_timeout: cfg.effective_liveness_timeout(),
            read_poll_interval: cfg.effective_read_poll(),
            candle_retention: cfg.effective_candle_retention(),
        }
    }
}

/// Connection state, tracked for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
}

/// One provider's connection and the protocol around it.
pub struct Session<S: WireSchema> {
    schema: Arc<S>,
    connector: Arc<dyn WsConnector>,
    config: SessionConfig,
    cache: Arc<MarketCache>,
    conn: Option<Box<dyn WsStream>>,
    state: ConnState,
}

impl<S: WireSchema> Session<S> {
    /// Dial the endpoint. Fails with [`FeedError::Connection`].
    pub async fn open(
        schema: Arc<S>,
        connector: Arc<dyn WsConnector>,
        config: SessionConfig,
        cache: Arc<MarketCache>,
    ) -> Result<Self, FeedError> {
        let conn = Self::dial(connector.clone(), config.ws_url.clone(), schema.name())
            .await
            .map_err(FeedError::Connection)?;
        let mut session = Self {
            schema,
            connector,
            config,
            cache,
            conn: Some(conn),
            state: ConnState::Connecting,
        };
        session.set_state(ConnState::Connected);
        Ok(session)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn cache(&self) -> &MarketCache {
        &self.cache
    }

    pub fn schema(&self) -> &S {
        &self.schema
    }

    /// Subscribe `pairs` on both channels, then record them as subscribed.
    ///
    /// Nothing is recorded if either request fails to go out.
    pub async fn subscribe_pairs(&mut self, pairs: &[CurrencyPair]) -> Result<(), FeedError> {
        self.subscribe_channels(pairs).await?;
        self.cache.record_subscription(pairs);
        info!("[{}] subscribed {} pair(s)", self.schema.name(), pairs.len());
        Ok(())
    }

    /// Write the ticker request, then the candle request, for `pairs`.
    pub async fn subscribe_channels(&mut self, pairs: &[CurrencyPair]) -> Result<(), FeedError> {
        if pairs.is_empty() {
            return Ok(());
        }
        let instruments: Vec<String> = pairs.iter().map(|p| self.schema.instrument_id(p)).collect();

        let tickers = self.schema.ticker_subscription(&instruments)?;
        debug!("[{}] subscribing tickers: {tickers}", self.schema.name());
        self.write(Frame::Text(tickers))
            .await
            .map_err(|e| FeedError::Subscription(format!("tickers {instruments:?}: {e}")))?;

        let candles = self.schema.candle_subscription(&instruments)?;
        debug!("[{}] subscribing candles: {candles}", self.schema.name());
        self.write(Frame::Text(candles))
            .await
            .map_err(|e| FeedError::Subscription(format!("candles {instruments:?}: {e}")))
    }

    /// Write one frame on the current connection.
    pub async fn write(&mut self, frame: Frame) -> Result<(), FeedError> {
        let conn = self.conn.as_mut().ok_or_else(|| FeedError::Write("not connected".into()))?;
        conn.send(frame).await.map_err(|e| FeedError::Write(e.to_string()))
    }

    /// Send a liveness probe. Failures are only logged; an unanswered probe
    /// is caught by the liveness timer.
    pub async fn send_keepalive(&mut self) {
        let probe = self.schema.keepalive();
        if let Err(e) = self.write(probe).await {
            debug!("[{}] could not send keepalive: {e}", self.schema.name());
        }
    }

    /// Replace the connection and re-issue every recorded subscription.
    pub async fn reconnect(&mut self) -> Result<(), FeedError> {
        self.set_state(ConnState::Reconnecting);
        self.close().await;

        let url = self.config.ws_url.clone();
        let conn = match Self::dial(self.connector.clone(), url, self.schema.name()).await {
            Ok(conn) => conn,
            Err(e) => {
                self.set_state(ConnState::Disconnected);
                return Err(FeedError::Reconnect(e));
            }
        };
        self.conn = Some(conn);
        self.set_state(ConnState::Connected);

        let pairs = self.cache.list_subscriptions();
        self.subscribe_channels(&pairs)
            .await
            .map_err(|e| FeedError::Reconnect(format!("resubscribe failed: {e}")))?;
        info!("[{}] reconnected, resubscribed {} pair(s)", self.schema.name(), pairs.len());
        Ok(())
    }

    /// Read the next frame.
    ///
    /// A closed or ended stream is an error. While disconnected this never
    /// completes, leaving the liveness timer to drive the next reconnect.
    pub async fn read_frame(&mut self) -> Result<Frame, FeedError> {
        let Some(conn) = self.conn.as_mut() else {
            return std::future::pending().await;
        };
        match conn.recv().await {
            Some(Ok(Frame::Close)) => Err(FeedError::Connection("closed by peer".into())),
            Some(Ok(frame)) => Ok(frame),
            Some(Err(e)) => Err(FeedError::Connection(e.to_string())),
            None => Err(FeedError::Connection("stream ended".into())),
        }
    }

    /// Close and drop the current connection, ignoring errors.
    pub async fn close(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            conn.close().await;
        }
    }

    /// Dial `url`. Takes owned handles so the future never borrows the session.
    async fn dial(
        connector: Arc<dyn WsConnector>,
        url: String,
        label: &'static str,
    ) -> Result<Box<dyn WsStream>, String> {
        info!("[{label}] connecting to {url}");
        connector.connect(&url).await.map_err(|e| {
            warn!("[{label}] connect failed: {e:#}");
            format!("{url}: {e:#}")
        })
    }

    fn set_state(&mut self, state: ConnState) {
        if self.state != state {
            debug!("[{}] {:?} -> {:?}", self.schema.name(), self.state, state);
            self.state = state;
        }
    }
}
