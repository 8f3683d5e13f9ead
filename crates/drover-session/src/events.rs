//! Per-session event log.

use std::collections::VecDeque;
use std::time::SystemTime;

use drover_dap::protocol::Event;

/// Upper bound on retained records per session; oldest are dropped.
const MAX_RECORDS: usize = 1000;

/// An immutable record of one adapter event, as published to
/// observers and retained in the session log.
#[derive(Debug, Clone)]
pub struct EventRecord {
    /// When the event was applied.
    pub timestamp: SystemTime,
    /// The owning session.
    pub session_id: String,
    /// The DAP event name (e.g. "stopped").
    pub kind: String,
    /// The raw event body.
    pub payload: serde_json::Value,
}

impl EventRecord {
    /// Build a record for an adapter event.
    pub fn from_event(session_id: impl Into<String>, event: &Event) -> Self {
        Self {
            timestamp: SystemTime::now(),
            session_id: session_id.into(),
            kind: event.event.clone(),
            payload: event.body.clone().unwrap_or(serde_json::Value::Null),
        }
    }

    /// Build a synthetic record for a client-side occurrence (e.g.
    /// an unexpected transport closure).
    pub fn synthetic(session_id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            session_id: session_id.into(),
            kind: kind.into(),
            payload: serde_json::Value::Null,
        }
    }
}

/// Append-only, capacity-capped log of event records.
#[derive(Debug, Default)]
pub struct EventLog {
    records: VecDeque<EventRecord>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, dropping the oldest past capacity.
    pub fn push(&mut self, record: EventRecord) {
        if self.records.len() == MAX_RECORDS {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Snapshot of all retained records, oldest first.
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.records.iter().cloned().collect()
    }
}
