//! # Pausitive Core Library
//!
//! Core logic for Pausitive, a guided breathing exercise client. The CLI
//! binary is a thin presentation layer over this crate.
//!
//! ## Architecture
//!
//! - **Catalog**: built-in breathing techniques (inhale/exhale seconds) and
//!   session modes (set counts)
//! - **Timing Engine**: a frame-driven state machine mapping clock time onto
//!   breathing phase and per-phase progress; the caller delivers frames
//! - **Session Tracker**: setup/active/paused/complete lifecycle with paused
//!   wall-clock accounting and a capped completed-session history
//! - **Storage**: SQLite key/value store and TOML configuration
//!
//! ## Key Components
//!
//! - [`BreathingEngine`]: core timing state machine
//! - [`SessionTracker`]: session lifecycle and history record
//! - [`BreathingSession`]: engine and tracker wired together
//! - [`EventBus`]: publish/subscribe registry used by both

pub mod catalog;
pub mod engine;
pub mod error;
pub mod events;
pub mod session;
pub mod storage;

pub use catalog::{Catalog, Level, SessionMode, Technique};
pub use engine::{
    BreathingEngine, Clock, EngineEvent, EngineEventKind, EngineSnapshot, EngineStatus, FrameId,
    FrameQueue, FrameScheduler, ManualClock, Phase, SessionPlan, SystemClock,
};
pub use error::{ConfigError, CoreError, EngineError, StorageError, TrackerError, ValidationError};
pub use events::{BusEvent, EventBus, Subscription};
pub use session::{AppState, BreathingSession, SessionRecord, SessionStats, SessionTracker};
pub use storage::{Config, Database, KvStore, MemoryStore, SessionHistory, StatsSummary};
