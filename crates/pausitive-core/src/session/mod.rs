mod coordinator;
mod record;
mod tracker;

pub use coordinator::BreathingSession;
pub use record::SessionRecord;
pub use tracker::{AppState, SessionSetup, SessionStats, SessionTracker, TrackerEvent, TrackerEventKind};
