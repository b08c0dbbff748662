//! The background task that owns the [`Session`] and drives every cache
//! mutation.
//!
//! Each iteration waits on whichever comes first:
//!
//! - shutdown signal → close the connection and exit
//! - subscribe command from the façade → write requests, reply with the result
//! - liveness expiry → one reconnect attempt, then re-arm the timer
//! - keepalive tick → send a probe
//! - inbound frame → re-arm the liveness timer, classify, apply
//!
//! No error ends the loop; only shutdown does.

use pf_core::ws::Frame;
use pf_core::{CurrencyPair, FeedError};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::cache::MarketCache;
use crate::schema::{MarketEvent, WireSchema};
use crate::session::Session;

/// Requests from the façade to the loop.
pub enum Command {
    Subscribe { pairs: Vec<CurrencyPair>, reply: oneshot::Sender<Result<(), FeedError>> },
}

/// Run until `shutdown` fires (or its sender is dropped).
pub async fn run<S: WireSchema>(
    mut session: Session<S>,
    mut commands: mpsc::Receiver<Command>,
    mut shutdown: watch::Receiver<bool>,
) {
    let label = session.schema().name();
    let liveness_timeout = session.config().liveness_timeout;
    let read_poll = session.config().read_poll_interval;

    let liveness = tokio::time::sleep(liveness_timeout);
    tokio::pin!(liveness);
    let mut keepalive = session.config().ping_interval.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });
    let mut read_failures: u64 = 0;

    info!("[{label}] receive loop started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("[{label}] shutdown signal received");
                session.close().await;
                return;
            }

            Some(command) = commands.recv() => {
                match command {
                    Command::Subscribe { pairs, reply } => {
                        let result = session.subscribe_pairs(&pairs).await;
                        if let Err(ref e) = result {
                            error!("[{label}] {e}");
                        }
                        let _ = reply.send(result);
                    }
                }
            }

            _ = &mut liveness => {
                warn!("[{label}] nothing read for {liveness_timeout:?}, reconnecting");
                if let Err(e) = session.reconnect().await {
                    error!("[{label}] {e}");
                }
                liveness.as_mut().reset(Instant::now() + liveness_timeout);
            }

            _ = keepalive_tick(&mut keepalive) => {
                trace!("[{label}] keepalive");
                session.send_keepalive().await;
            }

            read = session.read_frame() => match read {
                Ok(frame) => {
                    if frame_is_empty(&frame) {
                        continue;
                    }
                    read_failures = 0;
                    liveness.as_mut().reset(Instant::now() + liveness_timeout);
                    handle_frame(&mut session, frame).await;
                }
                Err(e) => {
                    read_failures += 1;
                    if read_failures == 1 {
                        warn!("[{label}] could not read message: {e}");
                    } else {
                        debug!("[{label}] could not read message ({read_failures} in a row): {e}");
                    }
                    session.send_keepalive().await;
                    tokio::select! {
                        _ = tokio::time::sleep(read_poll) => {}
                        _ = shutdown.changed() => {
                            info!("[{label}] shutdown signal received");
                            session.close().await;
                            return;
                        }
                    }
                }
            },
        }
    }
}

/// Classify a text frame and apply it to `cache`.
pub fn dispatch_text<S: WireSchema>(schema: &S, cache: &MarketCache, text: &str) {
    match schema.classify(text) {
        Some(MarketEvent::Tickers(rows)) => {
            for ticker in rows {
                cache.upsert_ticker(ticker);
            }
        }
        Some(MarketEvent::Candles { instrument, rows }) => {
            for row in &rows {
                if !cache.upsert_candle(&instrument, row) {
                    debug!(
                        "[{}] dropped candle for {instrument} with bad timestamp {:?}",
                        schema.name(),
                        row.timestamp
                    );
                }
            }
        }
        Some(MarketEvent::KeepaliveAck) => trace!("[{}] keepalive ack", schema.name()),
        None => debug!("[{}] unclassified message: {}", schema.name(), truncate(text, 256)),
    }
}

async fn handle_frame<S: WireSchema>(session: &mut Session<S>, frame: Frame) {
    match frame {
        Frame::Text(text) => dispatch_text(session.schema(), session.cache(), &text),
        Frame::Ping(payload) => {
            if let Err(e) = session.write(Frame::Pong(payload)).await {
                debug!("[{}] could not answer ping: {e}", session.schema().name());
            }
        }
        Frame::Pong(_) => trace!("[{}] keepalive ack", session.schema().name()),
        Frame::Binary(_) | Frame::Close => {}
    }
}

async fn keepalive_tick(keepalive: &mut Option<Interval>) {
    match keepalive {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn frame_is_empty(frame: &Frame) -> bool {
    match frame {
        Frame::Text(t) => t.is_empty(),
        Frame::Binary(b) => b.is_empty(),
        Frame::Ping(_) | Frame::Pong(_) | Frame::Close => false,
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
