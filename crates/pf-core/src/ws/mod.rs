//! WebSocket transport: the connector/stream seam used by providers, and its
//! tokio-tungstenite implementation.

pub mod client;

pub use client::{Frame, TungsteniteConnector, WsConnector, WsStream};
