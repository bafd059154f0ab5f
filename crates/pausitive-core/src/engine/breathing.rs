//! Breathing timing engine.
//!
//! Maps clock time onto breathing phase and per-phase progress. The engine
//! never sleeps or spawns anything: it asks its [`FrameScheduler`] for the
//! next frame and expects the owner of the scheduler to call [`tick`] with
//! that frame.
//!
//! ## State Transitions
//!
//! ```text
//! Uninitialized -> Ready -> Running <-> Paused
//!                            |          |
//!                            v          v
//!                     Completed     Stopped   (both -> Ready via initialize)
//! ```
//!
//! ## Stalled frames
//!
//! Progress is clamped to 1.0 and at most one phase advancement happens per
//! tick. A frame that arrives after a long stall therefore finishes only the
//! current phase and the next phase starts from the tick time; the stalled
//! overshoot is not carried over. Reported session length can run longer than
//! the planned length when frames stall.
//!
//! [`tick`]: BreathingEngine::tick

use std::fmt;

use serde::{Deserialize, Serialize};

use super::clock::Clock;
use super::event::{EngineEvent, EngineEventKind, Phase};
use super::scheduler::{FrameId, FrameScheduler};
use crate::catalog::Technique;
use crate::error::{EngineError, ValidationError};
use crate::events::{EventBus, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    Uninitialized,
    Ready,
    Running,
    Paused,
    Stopped,
    /// Stopped by the final phase advancement.
    Completed,
}

/// A validated technique plus set count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPlan {
    technique: Technique,
    total_sets: u32,
}

impl SessionPlan {
    pub fn new(technique: Technique, total_sets: u32) -> Result<Self, ValidationError> {
        technique.validate()?;
        if total_sets < 1 {
            return Err(ValidationError::InvalidSets {
                sets: total_sets,
                min: 1,
                max: u32::MAX,
            });
        }
        Ok(Self {
            technique,
            total_sets,
        })
    }

    pub fn technique(&self) -> &Technique {
        &self.technique
    }

    pub fn total_sets(&self) -> u32 {
        self.total_sets
    }

    pub fn phase_secs(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Inhale => self.technique.inhale_secs,
            Phase::Exhale => self.technique.exhale_secs,
        }
    }
}

/// Read-only view of the engine handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub status: EngineStatus,
    pub is_running: bool,
    pub is_paused: bool,
    pub phase: Phase,
    pub current_set: u32,
    pub total_sets: u32,
    /// 0.0 ..= 1.0 within the current phase.
    pub phase_progress: f64,
    pub phase_started_at_ms: f64,
    /// Seconds left in the current phase, as of the last tick.
    pub phase_remaining_secs: f64,
    pub technique: Option<Technique>,
}

pub struct BreathingEngine {
    plan: Option<SessionPlan>,
    status: EngineStatus,
    phase: Phase,
    current_set: u32,
    phase_progress: f64,
    phase_started_at_ms: f64,
    /// The only frame whose delivery will be honoured.
    pending_frame: Option<FrameId>,
    scheduler: Box<dyn FrameScheduler>,
    clock: Box<dyn Clock>,
    bus: EventBus<EngineEvent>,
}

impl BreathingEngine {
    pub fn new(scheduler: Box<dyn FrameScheduler>, clock: Box<dyn Clock>) -> Self {
        Self {
            plan: None,
            status: EngineStatus::Uninitialized,
            phase: Phase::Inhale,
            current_set: 1,
            phase_progress: 0.0,
            phase_started_at_ms: 0.0,
            pending_frame: None,
            scheduler,
            clock,
            bus: EventBus::new(),
        }
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe<F>(&mut self, kind: EngineEventKind, handler: F) -> Subscription<EngineEventKind>
    where
        F: FnMut(&EngineEvent) + 'static,
    {
        self.bus.subscribe(kind, handler)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription<EngineEventKind>) -> bool {
        self.bus.unsubscribe(subscription)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_set(&self) -> u32 {
        self.current_set
    }

    pub fn phase_progress(&self) -> f64 {
        self.phase_progress
    }

    pub fn plan(&self) -> Option<&SessionPlan> {
        self.plan.as_ref()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status, EngineStatus::Running | EngineStatus::Paused)
    }

    pub fn is_paused(&self) -> bool {
        self.status == EngineStatus::Paused
    }

    pub fn state(&self) -> EngineSnapshot {
        let phase_secs = self
            .plan
            .as_ref()
            .map(|p| p.phase_secs(self.phase))
            .unwrap_or(0.0);
        EngineSnapshot {
            status: self.status,
            is_running: self.is_running(),
            is_paused: self.is_paused(),
            phase: self.phase,
            current_set: self.current_set,
            total_sets: self.plan.as_ref().map(|p| p.total_sets).unwrap_or(0),
            phase_progress: self.phase_progress,
            phase_started_at_ms: self.phase_started_at_ms,
            phase_remaining_secs: phase_secs * (1.0 - self.phase_progress),
            technique: self.plan.as_ref().map(|p| p.technique.clone()),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Load a new plan. Allowed from any state; a session in flight is
    /// abandoned without events. Invalid input leaves the engine untouched.
    pub fn initialize(&mut self, technique: Technique, total_sets: u32) -> Result<(), ValidationError> {
        let plan = SessionPlan::new(technique, total_sets)?;
        self.load(plan);
        Ok(())
    }

    pub fn load(&mut self, plan: SessionPlan) {
        self.cancel_pending();
        tracing::debug!(
            technique = %plan.technique.id,
            total_sets = plan.total_sets,
            "engine initialized"
        );
        self.plan = Some(plan);
        self.status = EngineStatus::Ready;
        self.phase = Phase::Inhale;
        self.current_set = 1;
        self.phase_progress = 0.0;
        self.phase_started_at_ms = 0.0;
    }

    pub fn start(&mut self) -> Result<(), EngineError> {
        match self.status {
            EngineStatus::Paused => self.resume(),
            EngineStatus::Ready => {
                self.status = EngineStatus::Running;
                self.phase_started_at_ms = self.clock.now_ms();
                tracing::debug!(at_ms = self.phase_started_at_ms, "engine started");
                self.emit_phase_change();
                self.schedule_next();
                Ok(())
            }
            from => Err(EngineError::InvalidTransition {
                from,
                action: "start",
            }),
        }
    }

    /// Freeze at the last computed progress. Emits nothing.
    pub fn pause(&mut self) -> Result<(), EngineError> {
        if self.status != EngineStatus::Running {
            return Err(EngineError::InvalidTransition {
                from: self.status,
                action: "pause",
            });
        }
        self.cancel_pending();
        self.status = EngineStatus::Paused;
        tracing::debug!(progress = self.phase_progress, "engine paused");
        Ok(())
    }

    /// Continue from the frozen progress. The phase start is moved so that
    /// the frozen fraction is the current fraction at the instant of resume.
    pub fn resume(&mut self) -> Result<(), EngineError> {
        if self.status != EngineStatus::Paused {
            return Err(EngineError::InvalidTransition {
                from: self.status,
                action: "resume",
            });
        }
        let now = self.clock.now_ms();
        self.phase_started_at_ms = now - self.phase_progress * self.phase_duration_ms();
        self.status = EngineStatus::Running;
        tracing::debug!(progress = self.phase_progress, at_ms = now, "engine resumed");
        self.schedule_next();
        Ok(())
    }

    /// Halt the session. No-op when there is nothing in flight.
    pub fn stop(&mut self) {
        self.cancel_pending();
        if matches!(
            self.status,
            EngineStatus::Ready | EngineStatus::Running | EngineStatus::Paused
        ) {
            tracing::debug!(set = self.current_set, "engine stopped");
            self.status = EngineStatus::Stopped;
        }
    }

    /// Deliver a frame. Frames other than the one most recently requested,
    /// and any frame arriving while not running, are ignored.
    pub fn tick(&mut self, frame: FrameId, now_ms: f64) {
        if self.pending_frame != Some(frame) {
            tracing::trace!(?frame, "ignoring stale frame");
            return;
        }
        self.pending_frame = None;
        if self.status != EngineStatus::Running {
            return;
        }

        let elapsed = now_ms - self.phase_started_at_ms;
        let fraction = (elapsed / self.phase_duration_ms()).clamp(0.0, 1.0);
        self.phase_progress = fraction.max(self.phase_progress);

        let (phase, set, total_sets) = (self.phase, self.current_set, self.total_sets());
        self.bus.publish(&EngineEvent::Progress {
            phase,
            progress: self.phase_progress,
            set,
            total_sets,
        });

        if self.phase_progress >= 1.0 {
            self.advance_phase(now_ms);
        }

        if self.status == EngineStatus::Running {
            self.schedule_next();
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn advance_phase(&mut self, now_ms: f64) {
        match self.phase {
            Phase::Inhale => {
                self.begin_phase(Phase::Exhale, now_ms);
            }
            Phase::Exhale => {
                let total_sets = self.total_sets();
                self.bus.publish(&EngineEvent::SetComplete {
                    completed_set: self.current_set,
                    total_sets,
                });

                if self.current_set >= total_sets {
                    self.stop();
                    self.status = EngineStatus::Completed;
                    tracing::debug!(total_sets, "session complete");
                    if let Some(plan) = &self.plan {
                        let event = EngineEvent::SessionComplete {
                            total_sets,
                            technique: plan.technique.clone(),
                        };
                        self.bus.publish(&event);
                    }
                    return;
                }

                self.current_set += 1;
                self.begin_phase(Phase::Inhale, now_ms);
            }
        }
    }

    fn begin_phase(&mut self, phase: Phase, now_ms: f64) {
        self.phase = phase;
        self.phase_started_at_ms = now_ms;
        self.phase_progress = 0.0;
        self.emit_phase_change();
    }

    fn emit_phase_change(&mut self) {
        let event = EngineEvent::PhaseChange {
            phase: self.phase,
            set: self.current_set,
            total_sets: self.total_sets(),
        };
        self.bus.publish(&event);
    }

    fn schedule_next(&mut self) {
        self.cancel_pending();
        self.pending_frame = Some(self.scheduler.request_frame());
    }

    fn cancel_pending(&mut self) {
        if let Some(frame) = self.pending_frame.take() {
            self.scheduler.cancel_frame(frame);
        }
    }

    fn phase_duration_ms(&self) -> f64 {
        self.plan
            .as_ref()
            .map(|p| p.phase_secs(self.phase) * 1000.0)
            .unwrap_or(0.0)
    }

    fn total_sets(&self) -> u32 {
        self.plan.as_ref().map(|p| p.total_sets).unwrap_or(0)
    }
}

impl fmt::Debug for BreathingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreathingEngine")
            .field("status", &self.status)
            .field("phase", &self.phase)
            .field("current_set", &self.current_set)
            .field("phase_progress", &self.phase_progress)
            .field("pending_frame", &self.pending_frame)
            .field("bus", &self.bus)
            .finish()
    }
}
