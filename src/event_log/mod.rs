//! Event log
//!
//! An append-only, ordered record of everything observable that happened
//! during a session: connects, sends, inbound messages and failures. It is
//! the console a presentation layer renders.
//!
//! The host owns the log and hands a clone of the handle to the session,
//! which is then the only writer. Clones share the same storage, so the host
//! can take snapshots at any time. Every append is mirrored to `tracing`.

mod event;

pub use event::{LogEvent, LogLevel};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;

#[derive(Debug, Default)]
struct Inner {
    events: Vec<LogEvent>,
    next_sequence: u64,
}

#[derive(Debug, Clone, Default)]
pub struct EventLog {
    inner: Arc<Mutex<Inner>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, assigning it the next sequence number.
    pub fn append(&self, level: LogLevel, text: impl Into<String>) {
        let text = text.into();
        let mut inner = self.lock();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;

        match level {
            LogLevel::Info => tracing::info!(sequence, "{text}"),
            LogLevel::Error => tracing::error!(sequence, "{text}"),
        }

        inner.events.push(LogEvent {
            sequence,
            level,
            text,
            timestamp: Utc::now(),
        });
    }

    pub fn info(&self, text: impl Into<String>) {
        self.append(LogLevel::Info, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.append(LogLevel::Error, text);
    }

    /// Drop every event and restart numbering at zero.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.events.clear();
        inner.next_sequence = 0;
    }

    /// Ordered copy of the log as of this call.
    pub fn snapshot(&self) -> Vec<LogEvent> {
        self.lock().events.clone()
    }

    /// Events whose sequence number is `sequence` or later.
    pub fn since(&self, sequence: u64) -> Vec<LogEvent> {
        let inner = self.lock();
        // sequences are dense from zero, so the index is the sequence
        let start = usize::try_from(sequence).unwrap_or(usize::MAX);
        inner.events.get(start..).map(<[_]>::to_vec).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // a panic while holding the lock cannot leave the log half-written
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
