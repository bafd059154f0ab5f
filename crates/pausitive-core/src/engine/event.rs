use serde::{Deserialize, Serialize};

use crate::catalog::Technique;
use crate::events::BusEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Inhale,
    Exhale,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Inhale => "Breathe in",
            Phase::Exhale => "Breathe out",
        }
    }
}

/// Everything the engine tells its subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    /// Entering a new phase, including the first inhale of a session.
    PhaseChange {
        phase: Phase,
        set: u32,
        total_sets: u32,
    },
    /// Emitted on every live tick.
    Progress {
        phase: Phase,
        progress: f64,
        set: u32,
        total_sets: u32,
    },
    SetComplete {
        completed_set: u32,
        total_sets: u32,
    },
    /// Terminal. Emitted once per session.
    SessionComplete {
        total_sets: u32,
        technique: Technique,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineEventKind {
    PhaseChange,
    Progress,
    SetComplete,
    SessionComplete,
}

impl EngineEventKind {
    pub const ALL: [EngineEventKind; 4] = [
        EngineEventKind::PhaseChange,
        EngineEventKind::Progress,
        EngineEventKind::SetComplete,
        EngineEventKind::SessionComplete,
    ];
}

impl BusEvent for EngineEvent {
    type Kind = EngineEventKind;

    fn kind(&self) -> EngineEventKind {
        match self {
            EngineEvent::PhaseChange { .. } => EngineEventKind::PhaseChange,
            EngineEvent::Progress { .. } => EngineEventKind::Progress,
            EngineEvent::SetComplete { .. } => EngineEventKind::SetComplete,
            EngineEvent::SessionComplete { .. } => EngineEventKind::SessionComplete,
        }
    }
}
