mod breathing;
mod clock;
mod event;
mod scheduler;

pub use breathing::{BreathingEngine, EngineSnapshot, EngineStatus, SessionPlan};
pub use clock::{Clock, ManualClock, SystemClock};
pub use event::{EngineEvent, EngineEventKind, Phase};
pub use scheduler::{FrameId, FrameQueue, FrameScheduler};
