pub mod catalog;
pub mod config;
pub mod history;
pub mod run;
pub mod stats;

use pausitive_core::{Database, MemoryStore, SessionHistory};

/// History backed by the on-disk database, or an in-memory store when the
/// database cannot be opened.
pub fn open_history() -> SessionHistory {
    match Database::open() {
        Ok(db) => SessionHistory::new(Box::new(db)),
        Err(e) => {
            tracing::warn!("History unavailable, sessions will not be saved: {}", e);
            SessionHistory::new(Box::new(MemoryStore::new()))
        }
    }
}
