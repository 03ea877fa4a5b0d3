use std::time::Duration;

use super::mode::InteractionMode;
use super::time::Epoch;
use crate::speech::input::ListenGate;

/// Work the controller asks the driver to perform.
/// The controller never performs I/O itself; it returns these from `step`.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    /// Open the microphone for a new recognition pass.
    StartListening(ListenGate),
    StopListening,
    Speak(String),
    StopSpeaking,
    /// Post `Event::RestartDue { epoch }` back after at least `delay`.
    ScheduleRestart { epoch: Epoch, delay: Duration },
    ProcessText {
        epoch: Epoch,
        session_id: String,
        text: String,
        is_final: bool,
    },
    Confirm {
        epoch: Epoch,
        session_id: Option<String>,
        confirmed: bool,
    },
    /// Fire-and-forget; failures are logged only.
    ResetBackend { session_id: String },
    /// Hand a prompt to the main (non-voice) analysis pipeline.
    ReadyForPlanning(String),
    ModeChanged {
        from: InteractionMode,
        to: InteractionMode,
    },
    ReportError(String),
}
