//! Typed error definitions for the price feeder.
//!
//! [`FeedError`] separates the failure kinds callers react to differently:
//! connection and write failures are surfaced at startup or to the caller of
//! `subscribe`, and `NotFound` means "not warmed up yet, retry later". Frames
//! that match no known schema are dropped inside the receive loop and have no
//! variant here.

use thiserror::Error;

/// Domain-specific errors for streaming price providers.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The transport handshake with the exchange did not complete.
    #[error("connection error: {0}")]
    Connection(String),

    /// A frame could not be written on the current connection.
    #[error("write error: {0}")]
    Write(String),

    /// A subscription request could not be delivered.
    #[error("subscription error: {0}")]
    Subscription(String),

    /// Re-dialing or re-subscribing after a liveness expiry failed.
    #[error("reconnect error: {0}")]
    Reconnect(String),

    /// Nothing has been cached yet for the instrument.
    #[error("{provider} provider has no data for {instrument}")]
    NotFound { provider: String, instrument: String },

    /// A cached numeric field could not be converted.
    #[error("parse error: {0}")]
    Parse(String),

    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// The provider's background task has stopped.
    #[error("provider closed")]
    Closed,
}

impl FeedError {
    /// Build a [`FeedError::NotFound`] for `instrument`.
    pub fn not_found(provider: &str, instrument: &str) -> Self {
        Self::NotFound {
            provider: provider.to_string(),
            instrument: instrument.to_string(),
        }
    }

    /// Whether the caller should simply retry later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_not_found_is_retryable() {
        assert!(FeedError::not_found("okx", "BTC-USDT").is_retryable());
        assert!(!FeedError::Connection("refused".into()).is_retryable());
        assert!(!FeedError::Parse("bad".into()).is_retryable());
    }

    #[test]
    fn not_found_message_names_instrument() {
        let err = FeedError::not_found("okx", "ETH-USDT");
        assert_eq!(err.to_string(), "okx provider has no data for ETH-USDT");
    }
}
