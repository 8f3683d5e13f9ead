//! Breakpoint store for one debug session.
//!
//! The store holds, per source file, exactly the breakpoint list that
//! was last sent to the adapter: mutation is always replace-all at
//! the protocol boundary, never an incremental diff. Ids come from a
//! counter owned by the store instance and are never reused, even
//! after removal.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use drover_dap::protocol::{BreakpointInfo, SourceBreakpoint};

/// A requested breakpoint location.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointSpec {
    /// Line number (1-based).
    pub line: i64,
    /// Optional column.
    pub column: Option<i64>,
    /// Optional condition expression.
    pub condition: Option<String>,
}

impl BreakpointSpec {
    /// A plain line breakpoint.
    pub fn line(line: i64) -> Self {
        Self {
            line,
            column: None,
            condition: None,
        }
    }

    /// Attach a condition expression.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }
}

/// A tracked breakpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakpoint {
    /// Store-assigned id, unique across the session's lifetime.
    pub id: i64,
    /// Source file path.
    pub source: PathBuf,
    /// Line number (1-based).
    pub line: i64,
    /// Optional column.
    pub column: Option<i64>,
    /// Optional condition expression.
    pub condition: Option<String>,
    /// Whether the adapter has verified this breakpoint.
    pub verified: bool,
    /// Adapter-assigned id from the last verification fold.
    pub adapter_id: Option<i64>,
    /// Adapter-reported hit occurrences.
    pub hit_count: u64,
    /// When the breakpoint was first created.
    pub created_at: SystemTime,
}

/// Aggregate counts over the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakpointStats {
    /// Total tracked breakpoints.
    pub total: usize,
    /// How many the adapter has verified.
    pub verified: usize,
    /// Number of sources with at least one breakpoint.
    pub sources: usize,
}

/// Per-source breakpoint lists with a store-owned id counter.
#[derive(Debug)]
pub struct BreakpointStore {
    by_source: HashMap<PathBuf, Vec<Breakpoint>>,
    next_id: i64,
}

impl Default for BreakpointStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakpointStore {
    /// Create an empty store with a fresh id counter.
    pub fn new() -> Self {
        Self {
            by_source: HashMap::new(),
            next_id: 1,
        }
    }

    /// Replace the full breakpoint list for `source`.
    ///
    /// Entries whose line survives the replacement keep their id, hit
    /// count and creation time; new lines get fresh ids. Every entry
    /// is unverified until [`apply_verification`](Self::apply_verification)
    /// folds the adapter's answer back in.
    pub fn set_all(&mut self, source: &Path, specs: Vec<BreakpointSpec>) {
        let old = self.by_source.remove(source).unwrap_or_default();
        let mut list = Vec::with_capacity(specs.len());
        for spec in specs {
            let surviving = old.iter().find(|bp| bp.line == spec.line);
            let bp = match surviving {
                Some(prev) => Breakpoint {
                    id: prev.id,
                    source: source.to_path_buf(),
                    line: spec.line,
                    column: spec.column,
                    condition: spec.condition,
                    verified: false,
                    adapter_id: prev.adapter_id,
                    hit_count: prev.hit_count,
                    created_at: prev.created_at,
                },
                None => {
                    let id = self.next_id;
                    self.next_id += 1;
                    Breakpoint {
                        id,
                        source: source.to_path_buf(),
                        line: spec.line,
                        column: spec.column,
                        condition: spec.condition,
                        verified: false,
                        adapter_id: None,
                        hit_count: 0,
                        created_at: SystemTime::now(),
                    }
                }
            };
            list.push(bp);
        }
        if !list.is_empty() {
            self.by_source.insert(source.to_path_buf(), list);
        }
    }

    /// Fold the adapter's positional verification rows back into the
    /// source's list, in order. Extra rows are ignored; missing rows
    /// leave the remaining entries unverified.
    pub fn apply_verification(&mut self, source: &Path, rows: &[BreakpointInfo]) {
        let Some(list) = self.by_source.get_mut(source) else {
            return;
        };
        for (bp, row) in list.iter_mut().zip(rows) {
            bp.verified = row.verified;
            bp.adapter_id = row.id;
            if let Some(line) = row.line {
                bp.line = line;
            }
        }
    }

    /// Fold a single changed-breakpoint notification, matched by
    /// adapter id.
    pub fn apply_change(&mut self, info: &BreakpointInfo) {
        let Some(adapter_id) = info.id else { return };
        for list in self.by_source.values_mut() {
            for bp in list.iter_mut() {
                if bp.adapter_id == Some(adapter_id) {
                    bp.verified = info.verified;
                    if let Some(line) = info.line {
                        bp.line = line;
                    }
                }
            }
        }
    }

    /// Remove the breakpoint at `source:line`. Returns false when no
    /// such breakpoint exists.
    pub fn remove_line(&mut self, source: &Path, line: i64) -> bool {
        let Some(list) = self.by_source.get_mut(source) else {
            return false;
        };
        let before = list.len();
        list.retain(|bp| bp.line != line);
        let removed = list.len() != before;
        if list.is_empty() {
            self.by_source.remove(source);
        }
        removed
    }

    /// Remove every breakpoint for `source`. Returns false when the
    /// source had none.
    pub fn clear_source(&mut self, source: &Path) -> bool {
        self.by_source.remove(source).is_some()
    }

    /// Increment hit counts for the given adapter ids. Unknown ids
    /// are ignored. Returns the store ids that were hit.
    pub fn record_hits(&mut self, adapter_ids: &[i64]) -> Vec<i64> {
        let mut hit = Vec::new();
        for list in self.by_source.values_mut() {
            for bp in list.iter_mut() {
                if bp
                    .adapter_id
                    .is_some_and(|id| adapter_ids.contains(&id))
                {
                    bp.hit_count += 1;
                    hit.push(bp.id);
                }
            }
        }
        hit
    }

    /// The wire rows for `source`, in stored order. Empty when the
    /// source has no breakpoints (an empty list is still valid to
    /// send: it clears the source on the adapter).
    pub fn source_breakpoints(&self, source: &Path) -> Vec<SourceBreakpoint> {
        self.list_source(source)
            .iter()
            .map(|bp| SourceBreakpoint {
                line: bp.line,
                column: bp.column,
                condition: bp.condition.clone(),
            })
            .collect()
    }

    /// All breakpoints for one source, in stored order.
    pub fn list_source(&self, source: &Path) -> &[Breakpoint] {
        self.by_source.get(source).map_or(&[], |v| v.as_slice())
    }

    /// All breakpoints across all sources.
    pub fn list_all(&self) -> Vec<Breakpoint> {
        let mut all: Vec<Breakpoint> = self
            .by_source
            .values()
            .flat_map(|v| v.iter().cloned())
            .collect();
        all.sort_by_key(|bp| bp.id);
        all
    }

    /// Aggregate counts.
    pub fn stats(&self) -> BreakpointStats {
        let total = self.by_source.values().map(|v| v.len()).sum();
        let verified = self
            .by_source
            .values()
            .flat_map(|v| v.iter())
            .filter(|bp| bp.verified)
            .count();
        BreakpointStats {
            total,
            verified,
            sources: self.by_source.len(),
        }
    }
}
