use serde::{Serialize, Deserialize};
use crate::kernel::mode::InteractionMode;
use crate::kernel::time::Epoch;

// Allowed: Epochs, Modes, Durations, Flags
// Forbidden: Transcripts, Spoken text, Prompts, Error bodies

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    ModeTransition {
        from: InteractionMode,
        to: InteractionMode,
    },

    Lifecycle(LifecycleEvent),

    Dispatch {
        epoch: Epoch,
        kind: DispatchKind,
    },

    /// A second final transcript arrived while one was in flight.
    DispatchDropped,

    /// A reply or timer arrived after the controller moved on.
    StaleDiscarded {
        epoch: Epoch,
        source: StaleSource,
    },

    Interruption(InterruptionKind),

    RestartScheduled {
        delay_ms: u64,
    },

    Failure(FailureKind),

    PlanningHandoff {
        bootstrap: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    Activated,
    Deactivated,
    Reset,
    ActivationRefused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchKind {
    ProcessText,
    Confirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StaleSource {
    ProcessReply,
    ConfirmReply,
    RestartTimer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptionKind {
    /// Stop word spoken over the assistant.
    BargeIn,
    /// Lone stop word while the assistant was silent.
    StopWordSwallowed,
    /// Host pressed stop.
    ExplicitStop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    RecognitionRecoverable,
    RecognitionFatal,
    Synthesis,
    Backend,
    BackendErrorAction,
}
