//! Single WebSocket connection behind a small trait seam.
//!
//! Providers own exactly one [`WsStream`] at a time and replace it wholesale on
//! reconnect, so the seam is just "dial" ([`WsConnector`]) plus
//! "send / receive / close" ([`WsStream`]). [`TungsteniteConnector`] is the
//! production implementation (TLS via tokio-tungstenite); tests plug in an
//! in-memory connector.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

/// Upper bound on the TCP + TLS + WebSocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A WebSocket frame, independent of the transport library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

/// Opens connections to a WebSocket endpoint.
#[async_trait]
pub trait WsConnector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<Box<dyn WsStream>>;
}

/// One open WebSocket connection.
#[async_trait]
pub trait WsStream: Send {
    /// Write one frame.
    async fn send(&mut self, frame: Frame) -> Result<()>;

    /// Read the next frame. `None` once the stream has ended.
    ///
    /// Implementations must be cancel-safe: dropping the future before it
    /// completes loses no frame.
    async fn recv(&mut self) -> Option<Result<Frame>>;

    /// Close the connection, best-effort.
    async fn close(&mut self);
}

// ---------------------------------------------------------------------------
// tokio-tungstenite implementation
// ---------------------------------------------------------------------------

/// Dials TLS WebSocket connections with optional extra handshake headers.
#[derive(Debug, Clone, Default)]
pub struct TungsteniteConnector {
    extra_headers: HashMap<String, String>,
}

impl TungsteniteConnector {
    pub fn new(extra_headers: HashMap<String, String>) -> Self {
        Self { extra_headers }
    }
}

#[async_trait]
impl WsConnector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn WsStream>> {
        let mut request = url.into_client_request()?;
        for (key, value) in &self.extra_headers {
            let name = HeaderName::from_bytes(key.as_bytes())?;
            request.headers_mut().insert(name, HeaderValue::from_str(value)?);
        }

        let handshake = tokio_tungstenite::connect_async(request);
        let (stream, response) = tokio::time::timeout(CONNECT_TIMEOUT, handshake)
            .await
            .map_err(|_| anyhow!("handshake with {url} timed out after {CONNECT_TIMEOUT:?}"))?
            .with_context(|| format!("handshake with {url} failed"))?;
        debug!("connected to {url} (status {})", response.status());

        Ok(Box::new(TungsteniteStream { inner: stream }))
    }
}

struct TungsteniteStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl WsStream for TungsteniteStream {
    async fn send(&mut self, frame: Frame) -> Result<()> {
        let msg = match frame {
            Frame::Text(t) => Message::Text(t.into()),
            Frame::Binary(b) => Message::Binary(b.into()),
            Frame::Ping(p) => Message::Ping(p.into()),
            Frame::Pong(p) => Message::Pong(p.into()),
            Frame::Close => Message::Close(None),
        };
        self.inner.send(msg).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<Frame>> {
        loop {
            let frame = match self.inner.next().await? {
                Ok(Message::Text(t)) => Frame::Text(t.as_str().to_owned()),
                Ok(Message::Binary(b)) => Frame::Binary(b.to_vec()),
                Ok(Message::Ping(p)) => Frame::Ping(p.to_vec()),
                Ok(Message::Pong(p)) => Frame::Pong(p.to_vec()),
                Ok(Message::Close(_)) => Frame::Close,
                // Raw frames are never yielded while reading messages.
                Ok(Message::Frame(_)) => continue,
                Err(e) => return Some(Err(e.into())),
            };
            return Some(Ok(frame));
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.inner.close(None).await {
            debug!("close failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_rejects_non_ws_url() {
        let connector = TungsteniteConnector::default();
        assert!(connector.connect("not a url").await.is_err());
    }
}
