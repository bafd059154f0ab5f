//! Wires a [`BreathingEngine`] to a [`SessionTracker`].
//!
//! The engine's set and session events are queued while the engine is
//! ticking and applied to the tracker once the tick returns, so the tracker
//! never runs inside an engine callback.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use super::record::SessionRecord;
use super::tracker::{AppState, SessionSetup, SessionTracker};
use crate::catalog::{SessionMode, Technique};
use crate::engine::{BreathingEngine, EngineEvent, EngineEventKind, FrameId};
use crate::error::{CoreError, TrackerError};

pub struct BreathingSession {
    engine: BreathingEngine,
    tracker: SessionTracker,
    inbox: Rc<RefCell<VecDeque<EngineEvent>>>,
    last_setup: Option<SessionSetup>,
}

impl BreathingSession {
    pub fn new(mut engine: BreathingEngine, tracker: SessionTracker) -> Self {
        let inbox = Rc::new(RefCell::new(VecDeque::new()));
        for kind in [EngineEventKind::SetComplete, EngineEventKind::SessionComplete] {
            let inbox = inbox.clone();
            engine.subscribe(kind, move |event| inbox.borrow_mut().push_back(event.clone()));
        }
        Self {
            engine,
            tracker,
            inbox,
            last_setup: None,
        }
    }

    pub fn engine(&self) -> &BreathingEngine {
        &self.engine
    }

    /// For subscribing presentation handlers.
    pub fn engine_mut(&mut self) -> &mut BreathingEngine {
        &mut self.engine
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut SessionTracker {
        &mut self.tracker
    }

    /// Initialize both halves and start timing. Any session in flight is
    /// abandoned first.
    pub fn begin(
        &mut self,
        technique: Technique,
        mode: SessionMode,
        custom_sets: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        if self.tracker.state() != AppState::Setup {
            self.stop();
        }
        self.tracker
            .initialize_session(technique.clone(), mode, custom_sets, now)?;
        self.last_setup = self.tracker.session_setup().cloned();
        let total_sets = self
            .tracker
            .session_stats()
            .map(|s| s.total_sets)
            .unwrap_or(1);
        if let Err(e) = self.engine.initialize(technique, total_sets) {
            self.tracker.reset_to_setup();
            return Err(e.into());
        }
        self.engine.start()?;
        self.tracker.start_session()?;
        Ok(())
    }

    /// Run the session that just finished (or was stopped) again.
    pub fn repeat(&mut self, now: DateTime<Utc>) -> Result<(), CoreError> {
        let setup = self
            .last_setup
            .clone()
            .ok_or(TrackerError::InvalidTransition {
                from: self.tracker.state(),
                action: "repeat session",
            })?;
        self.begin(setup.technique, setup.mode, setup.custom_sets, now)
    }

    /// Deliver one frame. Returns the history record when this frame
    /// finished the session.
    pub fn pump(&mut self, frame: FrameId, now_ms: f64, now: DateTime<Utc>) -> Option<SessionRecord> {
        self.engine.tick(frame, now_ms);

        let mut record = None;
        loop {
            let Some(event) = self.inbox.borrow_mut().pop_front() else {
                break;
            };
            match event {
                EngineEvent::SetComplete {
                    completed_set,
                    total_sets,
                } => {
                    let current = (completed_set + 1).min(total_sets);
                    if let Err(e) = self.tracker.update_progress(current, completed_set) {
                        tracing::warn!("Dropping set progress: {}", e);
                    }
                }
                EngineEvent::SessionComplete { .. } => match self.tracker.complete_session(now) {
                    Ok(r) => record = Some(r),
                    Err(e) => tracing::warn!("Session completion not recorded: {}", e),
                },
                _ => {}
            }
        }
        record
    }

    /// Pause when running, resume when paused. Returns the new state.
    pub fn toggle_pause(&mut self, now: DateTime<Utc>) -> Result<AppState, CoreError> {
        if self.engine.is_paused() {
            self.engine.resume()?;
            self.tracker.resume_session(now)?;
        } else {
            self.engine.pause()?;
            self.tracker.pause_session(now)?;
        }
        Ok(self.tracker.state())
    }

    /// Abandon the session without recording it.
    pub fn stop(&mut self) {
        self.engine.stop();
        self.inbox.borrow_mut().clear();
        if self.tracker.state() != AppState::Setup {
            self.tracker.reset_to_setup();
        }
    }
}
