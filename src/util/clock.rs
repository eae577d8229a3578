//! Clock helpers shared by the engine and its backends.

use chrono::{DateTime, Utc};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Current wall-clock time as a UTC timestamp.
///
/// Generation entry points accept a `now` override for deterministic runs;
/// this is the fallback when no override is supplied.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}
