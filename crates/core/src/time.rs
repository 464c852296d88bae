//! Time helpers for the outbound event contract

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as epoch seconds, the `t` field of every outbound event.
pub fn epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
