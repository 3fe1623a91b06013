use core_types::{ControlSignal, InstructionBatch};
use serde::Deserialize;

/// One line of driver input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DriverInput {
    Instruction(InstructionBatch),
    Pause,
    Resume,
    Shutdown,
    Describe,
}

impl DriverInput {
    pub fn control_signal(&self) -> Option<ControlSignal> {
        match self {
            DriverInput::Pause => Some(ControlSignal::Pause),
            DriverInput::Resume => Some(ControlSignal::Resume),
            DriverInput::Shutdown => Some(ControlSignal::Shutdown),
            DriverInput::Instruction(_) | DriverInput::Describe => None,
        }
    }
}

/// Blank lines parse to `None`.
pub fn parse_line(line: &str) -> Result<Option<DriverInput>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}
