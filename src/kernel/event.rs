use super::time::Epoch;
use crate::error::BackendError;
use crate::services::backend::types::{ConfirmReply, ProcessReply};
use crate::speech::input::InputEvent;
use crate::speech::output::OutputEvent;

/// Imperative requests from the embedding application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Activate,
    Deactivate,
    Toggle,
    StopSpeaking,
    /// Explicit confirm/reject of the pending refined prompt (UI affordance, not voice).
    ConfirmPrompt(bool),
    /// Deactivate, clear transient state and ask the backend to forget the voice session.
    Reset,
    /// Deactivate without notifying the backend. Used on unmount/shutdown.
    Teardown,
    /// The host switched chats. Voice activity is kept.
    SessionChanged(Option<String>),
}

/// Everything the controller reacts to. Channel callbacks, backend replies and
/// timers are all posted in as events; nothing closes over controller state.
#[derive(Debug, Clone)]
pub enum Event {
    Command(Command),
    Input(InputEvent),
    Output(OutputEvent),
    ProcessReplied {
        epoch: Epoch,
        outcome: Result<ProcessReply, BackendError>,
    },
    ConfirmReplied {
        epoch: Epoch,
        outcome: Result<ConfirmReply, BackendError>,
    },
    RestartDue {
        epoch: Epoch,
    },
}

impl From<Command> for Event {
    fn from(cmd: Command) -> Self {
        Event::Command(cmd)
    }
}

impl From<InputEvent> for Event {
    fn from(ev: InputEvent) -> Self {
        Event::Input(ev)
    }
}

impl From<OutputEvent> for Event {
    fn from(ev: OutputEvent) -> Self {
        Event::Output(ev)
    }
}
