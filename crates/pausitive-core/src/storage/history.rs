//! Completed-session history.
//!
//! The whole history is one JSON array stored under [`HISTORY_KEY`], most
//! recent first and capped at [`HISTORY_LIMIT`] entries. Every operation here
//! is best effort: read failures and corrupt data yield an empty history,
//! write failures are logged and dropped.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::KvStore;
use crate::error::StorageError;
use crate::session::SessionRecord;

pub const HISTORY_KEY: &str = "pausitive.history";
pub const HISTORY_LIMIT: usize = 50;

/// Aggregates over the stored history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_sessions: usize,
    /// Sum of active (non-paused) session time.
    pub total_time_ms: u64,
    /// Mean of planned set counts.
    pub average_sets: f64,
    pub favorite_mode: Option<String>,
    pub favorite_technique: Option<String>,
}

pub struct SessionHistory {
    store: Box<dyn KvStore>,
}

impl SessionHistory {
    pub fn new(store: Box<dyn KvStore>) -> Self {
        Self { store }
    }

    /// All records, most recent first. Never fails.
    pub fn load(&self) -> Vec<SessionRecord> {
        match self.try_load() {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Failed to load session history: {}", e);
                Vec::new()
            }
        }
    }

    fn try_load(&self) -> Result<Vec<SessionRecord>, StorageError> {
        match self.store.get(HISTORY_KEY)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    /// Prepend `record` and drop anything past the cap.
    ///
    /// Returns whether the write reached the store.
    pub fn append(&self, record: SessionRecord) -> bool {
        let mut history = self.load();
        history.insert(0, record);
        history.truncate(HISTORY_LIMIT);
        match self.save(&history) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to save session history: {}", e);
                false
            }
        }
    }

    fn save(&self, history: &[SessionRecord]) -> Result<(), StorageError> {
        let json = serde_json::to_string(history)?;
        self.store.set(HISTORY_KEY, &json)
    }

    pub fn clear(&self) -> bool {
        match self.store.remove(HISTORY_KEY) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to clear session history: {}", e);
                false
            }
        }
    }

    pub fn summary(&self) -> StatsSummary {
        summarize(&self.load())
    }
}

pub fn summarize(history: &[SessionRecord]) -> StatsSummary {
    if history.is_empty() {
        return StatsSummary::default();
    }
    let total_sets: u64 = history.iter().map(|r| u64::from(r.total_sets)).sum();
    StatsSummary {
        total_sessions: history.len(),
        total_time_ms: history.iter().map(|r| r.total_duration_ms).sum(),
        average_sets: total_sets as f64 / history.len() as f64,
        favorite_mode: most_frequent(history.iter().map(|r| r.mode.id.as_str())),
        favorite_technique: most_frequent(history.iter().map(|r| r.technique.id.as_str())),
    }
}

/// Most common id; ties go to the id seen first.
fn most_frequent<'a>(ids: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, id) in ids.enumerate() {
        counts.entry(id).or_insert((0, position)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(id, _)| id.to_string())
}
