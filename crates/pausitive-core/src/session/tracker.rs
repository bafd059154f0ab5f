//! Coarse session lifecycle and paused-time accounting.
//!
//! The tracker mirrors the engine's pause/resume but keeps its own wall-clock
//! totals, since the engine forgets paused time once it resumes. Timestamps
//! are passed in by the caller.
//!
//! ```text
//! Setup -> Active <-> Paused
//!            |          |
//!            +----+-----+
//!                 v
//!             Complete -> Setup
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::SessionRecord;
use crate::catalog::{session_duration_secs, SessionMode, Technique};
use crate::error::{CoreError, TrackerError};
use crate::events::{BusEvent, EventBus, Subscription};
use crate::storage::SessionHistory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppState {
    Setup,
    Active,
    Paused,
    Complete,
}

/// What the user chose for the current session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSetup {
    pub technique: Technique,
    pub mode: SessionMode,
    pub custom_sets: Option<u32>,
    pub total_sets: u32,
    pub start_time: DateTime<Utc>,
    /// Planned length in seconds, ignoring pauses.
    pub planned_duration_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub current_set: u32,
    pub completed_sets: u32,
    pub total_sets: u32,
    pub start_time: DateTime<Utc>,
    pub paused_ms: u64,
    pub pause_started_at: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_duration_ms: Option<u64>,
    pub is_active: bool,
    pub is_paused: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TrackerEvent {
    StateChange { old: AppState, new: AppState },
    StatsUpdate { stats: SessionStats },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackerEventKind {
    StateChange,
    StatsUpdate,
}

impl BusEvent for TrackerEvent {
    type Kind = TrackerEventKind;

    fn kind(&self) -> TrackerEventKind {
        match self {
            TrackerEvent::StateChange { .. } => TrackerEventKind::StateChange,
            TrackerEvent::StatsUpdate { .. } => TrackerEventKind::StatsUpdate,
        }
    }
}

pub struct SessionTracker {
    state: AppState,
    setup: Option<SessionSetup>,
    stats: Option<SessionStats>,
    history: SessionHistory,
    bus: EventBus<TrackerEvent>,
}

impl SessionTracker {
    pub fn new(history: SessionHistory) -> Self {
        Self {
            state: AppState::Setup,
            setup: None,
            stats: None,
            history,
            bus: EventBus::new(),
        }
    }

    pub fn subscribe<F>(&mut self, kind: TrackerEventKind, handler: F) -> Subscription<TrackerEventKind>
    where
        F: FnMut(&TrackerEvent) + 'static,
    {
        self.bus.subscribe(kind, handler)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription<TrackerEventKind>) -> bool {
        self.bus.unsubscribe(subscription)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn session_setup(&self) -> Option<&SessionSetup> {
        self.setup.as_ref()
    }

    pub fn session_stats(&self) -> Option<&SessionStats> {
        self.stats.as_ref()
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    /// Completed sets as a rounded percentage of the total.
    pub fn progress_percentage(&self) -> u32 {
        match &self.stats {
            Some(stats) if stats.total_sets > 0 => {
                (f64::from(stats.completed_sets) / f64::from(stats.total_sets) * 100.0).round() as u32
            }
            _ => 0,
        }
    }

    /// Active time since the session began, excluding every pause.
    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        let Some(stats) = &self.stats else {
            return 0;
        };
        let end = stats.end_time.unwrap_or(now);
        let open_pause = stats
            .pause_started_at
            .map(|since| millis_between(since, end))
            .unwrap_or(0);
        millis_between(stats.start_time, end)
            .saturating_sub(stats.paused_ms)
            .saturating_sub(open_pause)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Select technique and mode. Moves to `Active`; timing starts with
    /// [`start_session`](Self::start_session).
    pub fn initialize_session(
        &mut self,
        technique: Technique,
        mode: SessionMode,
        custom_sets: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        if !matches!(self.state, AppState::Setup | AppState::Complete) {
            return Err(self.invalid("initialize session").into());
        }
        technique.validate()?;
        let total_sets = mode.resolve_sets(custom_sets)?;

        self.stats = Some(SessionStats {
            current_set: 1,
            completed_sets: 0,
            total_sets,
            start_time: now,
            paused_ms: 0,
            pause_started_at: None,
            end_time: None,
            total_duration_ms: None,
            is_active: false,
            is_paused: false,
        });
        self.setup = Some(SessionSetup {
            planned_duration_secs: session_duration_secs(&technique, total_sets),
            technique,
            mode,
            custom_sets,
            total_sets,
            start_time: now,
        });
        self.set_state(AppState::Active);
        Ok(())
    }

    pub fn start_session(&mut self) -> Result<(), TrackerError> {
        if self.state != AppState::Active {
            return Err(self.invalid("start session"));
        }
        if let Some(stats) = &mut self.stats {
            stats.is_active = true;
            stats.is_paused = false;
        }
        self.notify_stats();
        Ok(())
    }

    pub fn pause_session(&mut self, now: DateTime<Utc>) -> Result<(), TrackerError> {
        if self.state != AppState::Active {
            return Err(self.invalid("pause session"));
        }
        if let Some(stats) = &mut self.stats {
            stats.is_paused = true;
            stats.pause_started_at = Some(now);
        }
        self.set_state(AppState::Paused);
        self.notify_stats();
        Ok(())
    }

    pub fn resume_session(&mut self, now: DateTime<Utc>) -> Result<(), TrackerError> {
        if self.state != AppState::Paused {
            return Err(self.invalid("resume session"));
        }
        if let Some(stats) = &mut self.stats {
            close_pause(stats, now);
        }
        self.set_state(AppState::Active);
        self.notify_stats();
        Ok(())
    }

    pub fn update_progress(&mut self, current_set: u32, completed_sets: u32) -> Result<(), TrackerError> {
        if !matches!(self.state, AppState::Active | AppState::Paused) {
            return Err(self.invalid("update progress"));
        }
        if let Some(stats) = &mut self.stats {
            stats.current_set = current_set;
            stats.completed_sets = completed_sets;
        }
        self.notify_stats();
        Ok(())
    }

    /// Close the session and append its record to history.
    ///
    /// The history write is best effort; the record is returned either way.
    pub fn complete_session(&mut self, now: DateTime<Utc>) -> Result<SessionRecord, TrackerError> {
        if !matches!(self.state, AppState::Active | AppState::Paused) {
            return Err(self.invalid("complete session"));
        }
        let from = self.state;
        let (Some(setup), Some(stats)) = (&self.setup, &mut self.stats) else {
            return Err(TrackerError::InvalidTransition {
                from,
                action: "complete session",
            });
        };

        close_pause(stats, now);
        let total_duration_ms = millis_between(stats.start_time, now).saturating_sub(stats.paused_ms);
        stats.end_time = Some(now);
        stats.is_active = false;
        stats.total_duration_ms = Some(total_duration_ms);

        let record = SessionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            technique: setup.technique.clone(),
            mode: setup.mode.clone(),
            total_sets: stats.total_sets,
            completed_sets: stats.completed_sets,
            start_time: stats.start_time,
            end_time: now,
            total_duration_ms,
            paused_duration_ms: stats.paused_ms,
        };
        tracing::debug!(
            id = %record.id,
            completed_sets = record.completed_sets,
            total_duration_ms,
            "session complete"
        );

        self.history.append(record.clone());
        self.set_state(AppState::Complete);
        Ok(record)
    }

    pub fn reset_to_setup(&mut self) {
        self.setup = None;
        self.stats = None;
        self.set_state(AppState::Setup);
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn set_state(&mut self, new: AppState) {
        let old = self.state;
        self.state = new;
        self.bus.publish(&TrackerEvent::StateChange { old, new });
    }

    fn notify_stats(&mut self) {
        if let Some(stats) = &self.stats {
            let event = TrackerEvent::StatsUpdate {
                stats: stats.clone(),
            };
            self.bus.publish(&event);
        }
    }

    fn invalid(&self, action: &'static str) -> TrackerError {
        TrackerError::InvalidTransition {
            from: self.state,
            action,
        }
    }
}

fn close_pause(stats: &mut SessionStats, now: DateTime<Utc>) {
    if let Some(since) = stats.pause_started_at.take() {
        stats.paused_ms += millis_between(since, now);
    }
    stats.is_paused = false;
}

/// Milliseconds from `from` to `to`, zero if `to` is earlier.
fn millis_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from((to - from).num_milliseconds()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::catalog::Catalog;
    use crate::storage::{MemoryStore, HISTORY_LIMIT};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    fn tracker() -> SessionTracker {
        SessionTracker::new(SessionHistory::new(Box::new(MemoryStore::new())))
    }

    fn begin(tracker: &mut SessionTracker, mode: &str, custom: Option<u32>) {
        let catalog = Catalog::builtin();
        tracker
            .initialize_session(
                catalog.technique("technique-4-8").unwrap().clone(),
                catalog.mode(mode).unwrap().clone(),
                custom,
                t0(),
            )
            .unwrap();
    }

    #[test]
    fn initialize_moves_to_active_with_plan() {
        let mut tracker = tracker();
        begin(&mut tracker, "quick-break", None);
        assert_eq!(tracker.state(), AppState::Active);
        let setup = tracker.session_setup().unwrap();
        assert_eq!(setup.total_sets, 5);
        assert_eq!(setup.planned_duration_secs, 60.0);
        let stats = tracker.session_stats().unwrap();
        assert_eq!(stats.current_set, 1);
        assert!(!stats.is_active);
        tracker.start_session().unwrap();
        assert!(tracker.session_stats().unwrap().is_active);
    }

    #[test]
    fn custom_mode_requires_valid_sets() {
        let catalog = Catalog::builtin();
        let technique = catalog.technique("technique-4-8").unwrap().clone();
        let custom = catalog.mode("custom").unwrap().clone();
        let mut tracker = tracker();
        assert!(tracker
            .initialize_session(technique.clone(), custom.clone(), None, t0())
            .is_err());
        assert!(tracker
            .initialize_session(technique.clone(), custom.clone(), Some(0), t0())
            .is_err());
        assert_eq!(tracker.state(), AppState::Setup);
        tracker
            .initialize_session(technique, custom, Some(7), t0())
            .unwrap();
        assert_eq!(tracker.session_stats().unwrap().total_sets, 7);
    }

    #[test]
    fn paused_time_accumulates_across_pauses() {
        let mut tracker = tracker();
        begin(&mut tracker, "quick-break", None);
        tracker.start_session().unwrap();

        tracker.pause_session(t0() + Duration::seconds(10)).unwrap();
        assert_eq!(tracker.state(), AppState::Paused);
        tracker.resume_session(t0() + Duration::seconds(25)).unwrap();
        tracker.pause_session(t0() + Duration::seconds(30)).unwrap();
        tracker.resume_session(t0() + Duration::seconds(35)).unwrap();

        let stats = tracker.session_stats().unwrap();
        assert_eq!(stats.paused_ms, 20_000);
        assert!(!stats.is_paused);
        assert_eq!(tracker.elapsed_ms(t0() + Duration::seconds(40)), 20_000);
    }

    #[test]
    fn elapsed_excludes_open_pause() {
        let mut tracker = tracker();
        begin(&mut tracker, "quick-break", None);
        tracker.start_session().unwrap();
        tracker.pause_session(t0() + Duration::seconds(10)).unwrap();
        assert_eq!(tracker.elapsed_ms(t0() + Duration::seconds(50)), 10_000);
    }

    #[test]
    fn complete_computes_duration_and_appends_record() {
        let mut tracker = tracker();
        begin(&mut tracker, "quick-break", None);
        tracker.start_session().unwrap();
        tracker.pause_session(t0() + Duration::seconds(20)).unwrap();
        tracker.resume_session(t0() + Duration::seconds(50)).unwrap();
        tracker.update_progress(5, 5).unwrap();

        let record = tracker
            .complete_session(t0() + Duration::seconds(90))
            .unwrap();
        assert_eq!(record.total_duration_ms, 60_000);
        assert_eq!(record.paused_duration_ms, 30_000);
        assert_eq!(record.completed_sets, 5);
        assert_eq!(record.mode.id, "quick-break");
        assert_eq!(tracker.state(), AppState::Complete);
        assert_eq!(tracker.progress_percentage(), 100);

        let history = tracker.history().load();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0], record);
    }

    #[test]
    fn complete_while_paused_closes_the_pause() {
        let mut tracker = tracker();
        begin(&mut tracker, "quick-break", None);
        tracker.start_session().unwrap();
        tracker.pause_session(t0() + Duration::seconds(30)).unwrap();
        let record = tracker
            .complete_session(t0() + Duration::seconds(45))
            .unwrap();
        assert_eq!(record.paused_duration_ms, 15_000);
        assert_eq!(record.total_duration_ms, 30_000);
    }

    #[test]
    fn illegal_transitions_are_errors() {
        let mut tracker = tracker();
        assert!(tracker.start_session().is_err());
        assert!(tracker.pause_session(t0()).is_err());
        assert!(tracker.resume_session(t0()).is_err());
        assert!(tracker.update_progress(1, 0).is_err());
        assert!(tracker.complete_session(t0()).is_err());

        begin(&mut tracker, "quick-break", None);
        assert!(tracker.resume_session(t0()).is_err());
        let catalog = Catalog::builtin();
        assert!(tracker
            .initialize_session(
                catalog.technique("technique-4-8").unwrap().clone(),
                catalog.mode("meditate").unwrap().clone(),
                None,
                t0(),
            )
            .is_err());
    }

    #[test]
    fn reset_returns_to_setup_and_allows_new_session() {
        let mut tracker = tracker();
        begin(&mut tracker, "quick-break", None);
        tracker.start_session().unwrap();
        tracker.complete_session(t0() + Duration::seconds(60)).unwrap();
        tracker.reset_to_setup();
        assert_eq!(tracker.state(), AppState::Setup);
        assert!(tracker.session_stats().is_none());
        assert_eq!(tracker.progress_percentage(), 0);
        begin(&mut tracker, "slow-down", None);
        assert_eq!(tracker.state(), AppState::Active);
    }

    #[test]
    fn progress_percentage_rounds() {
        let mut tracker = tracker();
        begin(&mut tracker, "slow-down", None);
        tracker.update_progress(3, 2).unwrap();
        assert_eq!(tracker.progress_percentage(), 13);
    }

    #[test]
    fn state_changes_are_published() {
        let mut tracker = tracker();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        tracker.subscribe(TrackerEventKind::StateChange, move |e| {
            if let TrackerEvent::StateChange { old, new } = e {
                sink.borrow_mut().push((*old, *new));
            }
        });
        begin(&mut tracker, "quick-break", None);
        tracker.pause_session(t0()).unwrap();
        tracker.resume_session(t0()).unwrap();
        tracker.complete_session(t0()).unwrap();
        tracker.reset_to_setup();
        assert_eq!(
            *seen.borrow(),
            vec![
                (AppState::Setup, AppState::Active),
                (AppState::Active, AppState::Paused),
                (AppState::Paused, AppState::Active),
                (AppState::Active, AppState::Complete),
                (AppState::Complete, AppState::Setup),
            ]
        );
    }

    #[test]
    fn history_keeps_most_recent_fifty() {
        let mut tracker = tracker();
        let mut ids = Vec::new();
        for n in 0..(HISTORY_LIMIT as i64 + 5) {
            begin(&mut tracker, "quick-break", None);
            let record = tracker
                .complete_session(t0() + Duration::seconds(n))
                .unwrap();
            ids.push(record.id);
            tracker.reset_to_setup();
        }
        let stored: Vec<_> = tracker.history().load().into_iter().map(|r| r.id).collect();
        let expected: Vec<_> = ids.iter().rev().take(HISTORY_LIMIT).cloned().collect();
        assert_eq!(stored, expected);
    }
}
