//! Watch-expression store for one debug session.
//!
//! A pure store: it records expressions and the outcome of their most
//! recent evaluation, but performs no evaluation or state checks
//! itself. The session drives evaluation against the adapter.

use std::time::SystemTime;

/// A named watch expression with its last evaluation outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct Watch {
    /// Store-assigned id ("w1", "w2", ...).
    pub id: String,
    /// The expression text.
    pub expression: String,
    /// Last successful value, rendered by the adapter.
    pub value: Option<String>,
    /// Last evaluation error. Mutually exclusive with `value`.
    pub error: Option<String>,
    /// When the expression was last evaluated. Absent until the
    /// first evaluation and cleared when the expression changes.
    pub evaluated_at: Option<SystemTime>,
}

/// Ordered store of watch expressions with an instance-owned id
/// counter.
#[derive(Debug)]
pub struct WatchStore {
    entries: Vec<Watch>,
    next_id: u64,
}

impl Default for WatchStore {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchStore {
    /// Create an empty store with a fresh id counter.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// Add a watch. Returns the new entry.
    pub fn add(&mut self, expression: impl Into<String>) -> &Watch {
        let id = format!("w{}", self.next_id);
        self.next_id += 1;
        self.entries.push(Watch {
            id,
            expression: expression.into(),
            value: None,
            error: None,
            evaluated_at: None,
        });
        // Just pushed.
        &self.entries[self.entries.len() - 1]
    }

    /// Replace a watch's expression, atomically clearing its
    /// value/error/timestamp so a stale result can never be
    /// attributed to the new text.
    pub fn update(&mut self, id: &str, expression: impl Into<String>) -> Option<&Watch> {
        let entry = self.entries.iter_mut().find(|w| w.id == id)?;
        entry.expression = expression.into();
        entry.value = None;
        entry.error = None;
        entry.evaluated_at = None;
        Some(entry)
    }

    /// Remove a watch. Returns the removed entry.
    pub fn remove(&mut self, id: &str) -> Option<Watch> {
        let pos = self.entries.iter().position(|w| w.id == id)?;
        Some(self.entries.remove(pos))
    }

    /// Look up a watch by id.
    pub fn get(&self, id: &str) -> Option<&Watch> {
        self.entries.iter().find(|w| w.id == id)
    }

    /// Record a successful evaluation, clearing any prior error.
    pub fn record_success(&mut self, id: &str, value: impl Into<String>) -> Option<&Watch> {
        let entry = self.entries.iter_mut().find(|w| w.id == id)?;
        entry.value = Some(value.into());
        entry.error = None;
        entry.evaluated_at = Some(SystemTime::now());
        Some(entry)
    }

    /// Record a failed evaluation, clearing any prior value.
    pub fn record_error(&mut self, id: &str, message: impl Into<String>) -> Option<&Watch> {
        let entry = self.entries.iter_mut().find(|w| w.id == id)?;
        entry.value = None;
        entry.error = Some(message.into());
        entry.evaluated_at = Some(SystemTime::now());
        Some(entry)
    }

    /// Ids of all watches, in insertion order.
    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|w| w.id.clone()).collect()
    }

    /// All watches, in insertion order.
    pub fn list(&self) -> &[Watch] {
        &self.entries
    }

    /// Number of watches.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store has no watches.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
