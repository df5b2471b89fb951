//! Tunables for the registry and its processes.
use std::time::Duration;

use crate::error::TailError;

/// Default number of log lines retained per output stream.
pub const DEFAULT_LOG_CAPACITY: usize = 500;

/// Default time a stop waits for graceful exit before escalating to SIGKILL.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

/// Configuration shared by every process a [`Registry`](crate::registry::Registry) owns.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Capacity of each per-stream log buffer.
    pub log_capacity: usize,
    /// Grace period between SIGTERM and SIGKILL when stopping a process.
    pub stop_grace: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            log_capacity: DEFAULT_LOG_CAPACITY,
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }
}

/// Parses a human-friendly duration such as `"500ms"`, `"5"`, `"1s"`, `"2m"` or `"1h"`.
///
/// A bare number is interpreted as seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, TailError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(TailError::InvalidDuration(raw.to_string()));
    }

    let (amount_str, unit_millis) = if let Some(stripped) = value.strip_suffix("ms") {
        (stripped.trim(), 1)
    } else if let Some(stripped) = value.strip_suffix('s') {
        (stripped.trim(), 1_000)
    } else if let Some(stripped) = value.strip_suffix('m') {
        (stripped.trim(), 60_000)
    } else if let Some(stripped) = value.strip_suffix('h') {
        (stripped.trim(), 3_600_000)
    } else {
        (value, 1_000)
    };

    let amount: u64 = amount_str
        .parse()
        .map_err(|_| TailError::InvalidDuration(raw.to_string()))?;

    Ok(Duration::from_millis(amount.saturating_mul(unit_millis)))
}
