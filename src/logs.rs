//! Bounded in-memory capture of process output.
use std::{collections::VecDeque, sync::Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A single timestamped line of captured output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogItem {
    /// Capture time in Unix milliseconds.
    pub time: i64,
    /// The captured line, without its trailing newline.
    pub message: String,
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Fixed-capacity ring of [`LogItem`]s for one output stream of one process.
///
/// Writers push from the stream drain thread; readers only ever receive
/// point-in-time copies via [`LogBuffer::snapshot`]. Recorded timestamps are
/// strictly increasing within a buffer so a tail cursor can select new
/// entries with a plain `time > last_seen` comparison.
#[derive(Debug)]
pub struct LogBuffer {
    entries: Mutex<VecDeque<LogItem>>,
    capacity: usize,
}

impl LogBuffer {
    /// Creates an empty buffer holding at most `capacity` entries. A zero
    /// capacity is clamped to one so the bound always holds.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Appends one entry, evicting the single oldest entry when the buffer
    /// is full. Never fails; a poisoned lock is recovered since the ring
    /// holds no invariants beyond its bounds.
    pub fn push(&self, message: impl Into<String>, time: i64) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Keep recorded times strictly increasing so `time > last_seen`
        // identifies exactly the entries a tail client has not yet shown.
        let time = match entries.back() {
            Some(last) if time <= last.time => last.time + 1,
            _ => time,
        };

        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(LogItem {
            time,
            message: message.into(),
        });
    }

    /// Returns a point-in-time copy of the buffer, newest entry first.
    pub fn snapshot(&self) -> Vec<LogItem> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.iter().rev().cloned().collect()
    }

    /// Maximum number of entries the buffer retains.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether the buffer holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
