use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::error::DriverClosed;
use crate::kernel::event::Command;
use crate::kernel::state::VoiceStatus;

/// Cloneable handle to a running [`VoiceDriver`](super::driver::VoiceDriver).
#[derive(Clone)]
pub struct VoiceHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<VoiceStatus>,
    cancel: CancellationToken,
}

impl VoiceHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        status: watch::Receiver<VoiceStatus>,
        cancel: CancellationToken,
    ) -> Self {
        Self { commands, status, cancel }
    }

    pub fn send(&self, cmd: Command) -> Result<(), DriverClosed> {
        self.commands.send(cmd).map_err(|_| DriverClosed)
    }

    pub fn activate(&self) -> Result<(), DriverClosed> {
        self.send(Command::Activate)
    }

    pub fn deactivate(&self) -> Result<(), DriverClosed> {
        self.send(Command::Deactivate)
    }

    pub fn toggle(&self) -> Result<(), DriverClosed> {
        self.send(Command::Toggle)
    }

    pub fn stop_speaking(&self) -> Result<(), DriverClosed> {
        self.send(Command::StopSpeaking)
    }

    pub fn confirm_prompt(&self, confirmed: bool) -> Result<(), DriverClosed> {
        self.send(Command::ConfirmPrompt(confirmed))
    }

    pub fn reset(&self) -> Result<(), DriverClosed> {
        self.send(Command::Reset)
    }

    /// Switch the backend session. Does not reset voice activity.
    pub fn set_session(&self, session_id: Option<String>) -> Result<(), DriverClosed> {
        self.send(Command::SessionChanged(session_id))
    }

    /// Latest published status.
    pub fn status(&self) -> VoiceStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<VoiceStatus> {
        self.status.clone()
    }

    /// Tear the driver down (deactivate, no backend notification) and stop it.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}
