//! The provider façade: one exchange's streaming client behind
//! [`PriceProvider`].
//!
//! Construction dials the exchange, subscribes the initial pairs and spawns
//! the receive loop. Afterwards the façade only talks to the loop through a
//! command channel (subscriptions) and reads the shared [`MarketCache`]
//! directly (queries).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use pf_core::ws::WsConnector;
use pf_core::{CandlePrice, CurrencyPair, FeedError, TickerPrice};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::PriceProvider;
use crate::cache::MarketCache;
use crate::receive_loop::{self, Command};
use crate::schema::WireSchema;
use crate::session::{Session, SessionConfig};

/// Streaming price provider for the exchange described by `S`.
pub struct StreamingProvider<S: WireSchema> {
    schema: Arc<S>,
    cache: Arc<MarketCache>,
    commands: mpsc::Sender<Command>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<S: WireSchema> StreamingProvider<S> {
    /// Connect, subscribe `pairs`, and start the receive loop.
    ///
    /// Fails with [`FeedError::Connection`] if the endpoint cannot be dialed
    /// and [`FeedError::Subscription`] if the initial requests cannot be written.
    pub async fn connect(
        schema: S,
        connector: Arc<dyn WsConnector>,
        config: SessionConfig,
        pairs: &[CurrencyPair],
    ) -> Result<Self, FeedError> {
        let schema = Arc::new(schema);
        let cache = Arc::new(MarketCache::new(schema.name(), config.candle_retention));

        let mut session = Session::open(schema.clone(), connector, config, cache.clone()).await?;
        if let Err(e) = session.subscribe_pairs(pairs).await {
            session.close().await;
            return Err(e);
        }

        let (commands, command_rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(receive_loop::run(session, command_rx, shutdown_rx));
        info!("[{}] provider started", schema.name());

        Ok(Self { schema, cache, commands, shutdown_tx, task: Mutex::new(Some(task)) })
    }

}

#[async_trait]
impl<S: WireSchema> PriceProvider for StreamingProvider<S> {
    fn name(&self) -> &str {
        self.schema.name()
    }

    async fn subscribe(&self, pairs: &[CurrencyPair]) -> Result<(), FeedError> {
        let (reply, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::Subscribe { pairs: pairs.to_vec(), reply })
            .await
            .map_err(|_| FeedError::Closed)?;
        reply_rx.await.map_err(|_| FeedError::Closed)?
    }

    fn get_ticker_prices(
        &self,
        pairs: &[CurrencyPair],
    ) -> Result<HashMap<String, TickerPrice>, FeedError> {
        let mut prices = HashMap::with_capacity(pairs.len());
        for pair in pairs {
            let instrument = self.schema.instrument_id(pair);
            let ticker = self.cache.read_ticker(&instrument)?;
            prices.insert(pair.to_string(), ticker.to_ticker_price(self.schema.name())?);
        }
        Ok(prices)
    }

    fn get_candle_prices(
        &self,
        pairs: &[CurrencyPair],
    ) -> Result<HashMap<String, Vec<CandlePrice>>, FeedError> {
        let mut prices = HashMap::with_capacity(pairs.len());
        for pair in pairs {
            let instrument = self.schema.instrument_id(pair);
            let candles = self
                .cache
                .read_candles(&instrument)?
                .iter()
                .map(|c| c.to_candle_price(self.schema.name()))
                .collect::<Result<Vec<_>, _>>()?;
            prices.insert(pair.to_string(), candles);
        }
        Ok(prices)
    }

    fn subscribed_pairs(&self) -> Vec<CurrencyPair> {
        self.cache.list_subscriptions()
    }

    async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("[{}] receive loop ended abnormally: {e}", self.schema.name());
            }
        }
        info!("[{}] provider stopped", self.schema.name());
    }
}
