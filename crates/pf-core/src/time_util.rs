//! Wall-clock helpers.
//!
//! Exchange timestamps are Unix epoch **milliseconds**, so the cache works in
//! the same unit.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current time as **milliseconds** since Unix epoch.
#[inline]
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Epoch milliseconds `window` before `now_ms`.
#[inline]
pub fn lookback_ms(now_ms: i64, window: Duration) -> i64 {
    now_ms.saturating_sub(window.as_millis() as i64)
}
