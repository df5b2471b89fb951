//! Polling log tail client for the registry's logs endpoint.
use std::{thread, time::Duration};

use chrono::{Local, TimeZone};
use reqwest::blocking::Client;
use tracing::debug;

use crate::{error::TailError, logs::LogItem};

/// How many entries to show when a tail first attaches to a process.
const INITIAL_WINDOW: usize = 10;

/// Tracks which log entries a tail has already shown.
///
/// Snapshots arrive newest-first and carry strictly increasing timestamps,
/// so the cursor needs no server-side session state: the first non-empty
/// snapshot yields up to the [`INITIAL_WINDOW`] most recent entries and
/// every later snapshot yields exactly the entries newer than the last one
/// shown. If more entries arrive between polls than the buffer holds, the
/// overflow is silently lost; bounded loss is part of the contract.
#[derive(Debug, Default)]
pub struct TailCursor {
    last_seen: Option<i64>,
}

impl TailCursor {
    /// Creates a cursor that has seen nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the not-yet-shown entries of a newest-first snapshot, in
    /// chronological (oldest-first) order, and advances the cursor past
    /// them. An empty snapshot selects nothing and leaves the cursor
    /// untouched.
    pub fn select<'a>(&mut self, snapshot: &'a [LogItem]) -> Vec<&'a LogItem> {
        if snapshot.is_empty() {
            return Vec::new();
        }

        let fresh: Vec<&LogItem> = match self.last_seen {
            None => snapshot.iter().take(INITIAL_WINDOW).collect(),
            Some(last_seen) => snapshot
                .iter()
                .take_while(|item| item.time > last_seen)
                .collect(),
        };

        if let Some(newest) = fresh.first() {
            self.last_seen = Some(newest.time);
        }

        fresh.into_iter().rev().collect()
    }
}

/// Renders a log entry's capture time for terminal output.
fn format_time(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        None => millis.to_string(),
    }
}

/// Polls the logs endpoint for one process and prints newly arrived lines
/// until interrupted or until a fetch fails.
///
/// The endpoint is expected to return the full current snapshot as a JSON
/// array of `{time, message}` records, newest-first.
pub fn tail_logs(base_url: &str, id: &str, interval: Duration) -> Result<(), TailError> {
    let client = Client::new();
    let url = format!("{}/processes/{}/logs", base_url.trim_end_matches('/'), id);
    let mut cursor = TailCursor::new();

    debug!("Tailing {url} every {interval:?}");

    loop {
        thread::sleep(interval);

        let snapshot: Vec<LogItem> = client.get(&url).send()?.error_for_status()?.json()?;

        for item in cursor.select(&snapshot) {
            println!("{}: {}", format_time(item.time), item.message);
        }
    }
}
