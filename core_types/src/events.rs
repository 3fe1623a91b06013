use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Lifecycle state of the instruction writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WriterState {
    Running,
    Paused,
    Shutdown,
}

impl WriterState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WriterState::Shutdown)
    }
}

/// Control signals accepted by the lifecycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ControlSignal {
    Pause,
    Resume,
    Shutdown,
}

/// Emitted on every state entry so that callers can synchronize with the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LifecycleEvent {
    Running,
    Paused,
    Shutdown,
}

impl From<WriterState> for LifecycleEvent {
    fn from(state: WriterState) -> Self {
        match state {
            WriterState::Running => LifecycleEvent::Running,
            WriterState::Paused => LifecycleEvent::Paused,
            WriterState::Shutdown => LifecycleEvent::Shutdown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterDescription {
    pub component: String,
    pub state: WriterState,
}
