use serde::{Serialize, Deserialize};

/// The interaction modes of the voice assistant. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    /// Microphone closed, nothing in flight. Initial and terminal.
    Idle,
    /// Recognition requested or running, waiting for a final transcript.
    Listening,
    /// A transcript or confirmation is with the backend.
    Processing,
    /// The assistant is talking.
    Speaking,
    /// A refined prompt is held until the user confirms or rejects it.
    /// The assistant may speak and listen while in this mode.
    AwaitingConfirmation,
}

impl Default for InteractionMode {
    fn default() -> Self {
        Self::Idle
    }
}

impl InteractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionMode::Idle => "idle",
            InteractionMode::Listening => "listening",
            InteractionMode::Processing => "processing",
            InteractionMode::Speaking => "speaking",
            InteractionMode::AwaitingConfirmation => "awaiting_confirmation",
        }
    }
}

impl std::fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected transitions between modes.
/// The controller is the single writer; this graph only flags transitions that
/// should never happen so they show up in the logs.
pub struct ModeGraph;

impl ModeGraph {
    pub fn is_expected(from: InteractionMode, to: InteractionMode) -> bool {
        use InteractionMode::*;

        match (from, to) {
            (a, b) if a == b => true,
            // Deactivation and unrecoverable errors are legal from anywhere.
            (_, Idle) => true,

            (Idle, Listening) => true,

            (Listening, Processing) => true,
            // No-session bootstrap acknowledgement.
            (Listening, Speaking) => true,

            (Processing, Speaking) => true,
            (Processing, AwaitingConfirmation) => true,
            (Processing, Listening) => true,

            (Speaking, Listening) => true,
            // A transcript that arrives mid-playback without a stop word.
            (Speaking, Processing) => true,

            (AwaitingConfirmation, Listening) => true,
            (AwaitingConfirmation, Processing) => true,
            (AwaitingConfirmation, Speaking) => true,

            _ => false,
        }
    }
}
