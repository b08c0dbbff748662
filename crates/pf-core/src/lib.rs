//! # pf-core
//!
//! Core crate for the price feeder, providing:
//!
//! - **Types** (`types`) — currency pairs, ticker/candle observations and prices
//! - **Configuration** (`config`) — JSON config deserialization and validation
//! - **Error types** (`error`) — the `FeedError` taxonomy via thiserror
//! - **WebSocket** (`ws`) — transport seam plus the tokio-tungstenite client
//! - **Time utilities** (`time_util`) — epoch timestamps and lookback helpers
//! - **Logging** (`logging`) — tracing-based structured logging

pub mod config;
pub mod error;
pub mod logging;
pub mod time_util;
pub mod types;
pub mod ws;

pub use error::FeedError;
// Re-export types at crate root for convenience.
pub use types::*;
