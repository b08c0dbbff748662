//! In-memory WebSocket transport for driving providers in tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use parking_lot::Mutex;
use pf_core::config::ProviderConfig;
use pf_core::ws::{Frame, WsConnector, WsStream};
use tokio::sync::mpsc;

/// Connector handing out [`MockStream`]s and remembering each one.
#[derive(Default)]
pub struct MockConnector {
    attempts: AtomicUsize,
    fail_next: AtomicUsize,
    connections: Mutex<Vec<MockHandle>>,
}

impl MockConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the next `n` dials fail.
    pub fn fail_next_connects(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Dial attempts, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Successfully opened connections, oldest first.
    pub fn connections(&self) -> Vec<MockHandle> {
        self.connections.lock().clone()
    }

    pub fn connection(&self, idx: usize) -> MockHandle {
        self.connections.lock()[idx].clone()
    }
}

#[async_trait]
impl WsConnector for MockConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn WsStream>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            bail!("connection to {url} refused");
        }

        let (inbound, inbound_rx) = mpsc::unbounded_channel();
        let handle = MockHandle {
            sent: Arc::new(Mutex::new(Vec::new())),
            inbound,
            closed: Arc::new(AtomicBool::new(false)),
            write_budget: Arc::new(AtomicUsize::new(usize::MAX)),
        };
        self.connections.lock().push(handle.clone());
        Ok(Box::new(MockStream {
            sent: handle.sent.clone(),
            inbound_rx,
            closed: handle.closed.clone(),
            write_budget: handle.write_budget.clone(),
        }))
    }
}

/// Test-side view of one mock connection.
#[derive(Clone)]
pub struct MockHandle {
    sent: Arc<Mutex<Vec<Frame>>>,
    inbound: mpsc::UnboundedSender<Result<Frame, String>>,
    closed: Arc<AtomicBool>,
    /// Writes still allowed to succeed; `usize::MAX` means unlimited.
    write_budget: Arc<AtomicUsize>,
}

impl MockHandle {
    /// Deliver a text frame to the provider.
    pub fn push_text(&self, text: &str) {
        self.push(Frame::Text(text.to_string()));
    }

    pub fn push(&self, frame: Frame) {
        let _ = self.inbound.send(Ok(frame));
    }

    /// Make the provider's next read fail.
    pub fn push_error(&self, msg: &str) {
        let _ = self.inbound.send(Err(msg.to_string()));
    }

    /// Fail every write (`true`) or none (`false`).
    pub fn set_fail_writes(&self, fail: bool) {
        let budget = if fail { 0 } else { usize::MAX };
        self.write_budget.store(budget, Ordering::SeqCst);
    }

    /// Let the next `n` writes through, then fail every write after them.
    pub fn fail_writes_after(&self, n: usize) {
        self.write_budget.store(n, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Frame> {
        self.sent.lock().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|f| match f {
                Frame::Text(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// Subscribe requests written so far, as `(channel, instIds)` per frame.
    ///
    /// Panics if a single request mixes channels.
    pub fn subscriptions(&self) -> Vec<(String, Vec<String>)> {
        self.sent_texts()
            .iter()
            .filter_map(|t| serde_json::from_str::<serde_json::Value>(t).ok())
            .filter(|v| v["op"] == "subscribe")
            .map(|v| {
                let args = v["args"].as_array().cloned().unwrap_or_default();
                let channel = args
                    .first()
                    .map(|a| a["channel"].as_str().unwrap().to_string())
                    .unwrap_or_default();
                let ids = args
                    .iter()
                    .map(|a| {
                        assert_eq!(a["channel"].as_str().unwrap(), channel);
                        a["instId"].as_str().unwrap().to_string()
                    })
                    .collect();
                (channel, ids)
            })
            .collect()
    }

    /// Number of `"ping"` keepalive probes written.
    pub fn pings(&self) -> usize {
        self.sent_texts().iter().filter(|t| *t == "ping").count()
    }
}

struct MockStream {
    sent: Arc<Mutex<Vec<Frame>>>,
    inbound_rx: mpsc::UnboundedReceiver<Result<Frame, String>>,
    closed: Arc<AtomicBool>,
    write_budget: Arc<AtomicUsize>,
}

#[async_trait]
impl WsStream for MockStream {
    async fn send(&mut self, frame: Frame) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            bail!("connection closed");
        }
        let allowed = self
            .write_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
                usize::MAX => Some(n),
                _ => n.checked_sub(1),
            })
            .is_ok();
        if !allowed {
            bail!("broken pipe");
        }
        self.sent.lock().push(frame);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<Frame>> {
        self.inbound_rx.recv().await.map(|r| r.map_err(|e| anyhow!(e)))
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// OKX config with periodic keepalives off, so only the liveness timer and
/// explicit frames drive the session.
pub fn okx_config(pairs: &[&str]) -> ProviderConfig {
    ProviderConfig {
        pairs: pairs.iter().map(|p| p.to_string()).collect(),
        ws_url: Some("wss://mock.invalid/ws/v5/public".into()),
        ping_interval_sec: Some(0),
        liveness_timeout_sec: Some(28),
        ..ProviderConfig::new("okx")
    }
}

/// Poll `cond` until it holds, yielding to the provider task in between.
pub async fn wait_until<F: FnMut() -> bool>(mut cond: F) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}
