//! Human-readable duration tokens such as `50s`, `500ms`, `2min` or `1h`.

use std::time::Duration;

use crate::error::MonitorError;

/// Convert a duration token into seconds.
///
/// Exactly four suffixes are recognized: `ms`, `s`, `min` and `h`. The prefix
/// must be a non-negative base-10 integer. The token is trimmed and
/// lower-cased first, and `ms` is matched before `s`.
pub fn to_seconds(token: &str) -> Result<f64, MonitorError> {
    to_millis(token).map(|millis| millis as f64 / 1000.0)
}

/// Parse a duration token into a [`Duration`].
pub fn parse_duration(token: &str) -> Result<Duration, MonitorError> {
    to_millis(token).map(Duration::from_millis)
}

fn to_millis(token: &str) -> Result<u64, MonitorError> {
    let normalized = token.trim().to_lowercase();

    let unsupported = || {
        tracing::error!(token, "Unsupported time format");
        MonitorError::UnsupportedDuration(token.to_string())
    };

    let (prefix, millis_per_unit) = if let Some(p) = normalized.strip_suffix("ms") {
        (p, 1)
    } else if let Some(p) = normalized.strip_suffix("min") {
        (p, 60_000)
    } else if let Some(p) = normalized.strip_suffix('s') {
        (p, 1_000)
    } else if let Some(p) = normalized.strip_suffix('h') {
        (p, 3_600_000)
    } else {
        return Err(unsupported());
    };

    prefix
        .parse::<u64>()
        .ok()
        .and_then(|value| value.checked_mul(millis_per_unit))
        .ok_or_else(unsupported)
}
