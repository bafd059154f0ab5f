use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{SessionMode, Technique};

/// Snapshot of one completed session. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub technique: Technique,
    pub mode: SessionMode,
    pub total_sets: u32,
    pub completed_sets: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Wall-clock time minus paused time.
    pub total_duration_ms: u64,
    pub paused_duration_ms: u64,
}
