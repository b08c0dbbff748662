//! Provider registry — factory for creating providers from config.

use std::sync::Arc;

use anyhow::Result;
use pf_core::FeedError;
use pf_core::config::ProviderConfig;
use pf_core::ws::{TungsteniteConnector, WsConnector};

use crate::PriceProvider;

/// Create a provider based on the `exchange` field, dialing with
/// tokio-tungstenite.
pub async fn create_provider(config: &ProviderConfig) -> Result<Box<dyn PriceProvider>> {
    let connector = Arc::new(TungsteniteConnector::new(config.extra_headers.clone()));
    create_provider_with(config, connector).await
}

/// Create a provider based on the `exchange` field using `connector`.
pub async fn create_provider_with(
    config: &ProviderConfig,
    connector: Arc<dyn WsConnector>,
) -> Result<Box<dyn PriceProvider>> {
    config.validate()?;

    match config.exchange.to_lowercase().as_str() {
        "okx" => Ok(Box::new(crate::okx::connect(config, connector).await?)),
        other => Err(FeedError::Config(format!("unknown exchange: {other}")).into()),
    }
}
