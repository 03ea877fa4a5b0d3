use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::handle::VoiceHandle;
use super::hooks::VoiceHooks;
use crate::kernel::controller::{ControllerConfig, DialogueController};
use crate::kernel::effect::SideEffect;
use crate::kernel::event::{Command, Event};
use crate::kernel::state::VoiceStatus;
use crate::kernel::telemetry::metrics::TelemetrySnapshot;
use crate::services::backend::client::VoiceBackend;
use crate::speech::input::{
    InputEvent, RecognitionEngine, RecognitionFailure, RecognitionSignal, SpeechInputChannel,
    StartOutcome,
};
use crate::speech::output::{SpeechOutputChannel, SpeechSettings, SynthesisEngine, SynthesisSignal};

/// Everything a driver needs. The engines are the platform capabilities;
/// the driver builds the channels around them.
pub struct DriverParts {
    pub recognizer: Box<dyn RecognitionEngine>,
    pub synthesizer: Box<dyn SynthesisEngine>,
    pub backend: Arc<dyn VoiceBackend>,
    pub hooks: Arc<dyn VoiceHooks>,
    pub speech: SpeechSettings,
    pub controller: ControllerConfig,
    pub session_id: Option<String>,
}

/// Async shell around the pure controller.
///
/// Drains commands, engine signals and completions one at a time, steps the
/// controller, and executes the side effects it returns. Backend calls and
/// restart timers run as spawned tasks that post their result back in.
pub struct VoiceDriver {
    controller: DialogueController,
    input: SpeechInputChannel,
    output: SpeechOutputChannel,
    backend: Arc<dyn VoiceBackend>,
    hooks: Arc<dyn VoiceHooks>,

    commands: mpsc::UnboundedReceiver<Command>,
    recognition: mpsc::UnboundedReceiver<RecognitionSignal>,
    synthesis: mpsc::UnboundedReceiver<SynthesisSignal>,
    completions: mpsc::UnboundedReceiver<Event>,
    completion_tx: mpsc::UnboundedSender<Event>,

    status_tx: watch::Sender<VoiceStatus>,
    cancel: CancellationToken,
}

impl VoiceDriver {
    pub fn new(parts: DriverParts) -> (Self, VoiceHandle) {
        let (cmd_tx, commands) = mpsc::unbounded_channel();
        let (rec_tx, recognition) = mpsc::unbounded_channel();
        let (syn_tx, synthesis) = mpsc::unbounded_channel();
        let (completion_tx, completions) = mpsc::unbounded_channel();

        let input = SpeechInputChannel::new(parts.recognizer, rec_tx);
        let output = SpeechOutputChannel::new(parts.synthesizer, syn_tx, parts.speech);

        let mut controller = DialogueController::new(input.is_supported(), parts.controller);
        controller.state.session_id = parts.session_id;

        let (status_tx, status_rx) = watch::channel(controller.status());
        let cancel = CancellationToken::new();
        let handle = VoiceHandle::new(cmd_tx, status_rx, cancel.clone());

        let driver = Self {
            controller,
            input,
            output,
            backend: parts.backend,
            hooks: parts.hooks,
            commands,
            recognition,
            synthesis,
            completions,
            completion_tx,
            status_tx,
            cancel,
        };
        (driver, handle)
    }

    /// Build the driver and run it on the current runtime.
    pub fn spawn(parts: DriverParts) -> (VoiceHandle, tokio::task::JoinHandle<TelemetrySnapshot>) {
        let (driver, handle) = Self::new(parts);
        let task = tokio::spawn(driver.run());
        (handle, task)
    }

    /// Runs until shut down or every handle is dropped.
    /// Returns the session's telemetry summary.
    pub async fn run(mut self) -> TelemetrySnapshot {
        info!("Voice driver started");

        loop {
            let event: Event = tokio::select! {
                _ = self.cancel.cancelled() => break,

                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => cmd.into(),
                    None => break,
                },

                Some(signal) = self.recognition.recv() => match self.input.accept(signal) {
                    Some(ev) => ev.into(),
                    None => continue,
                },

                Some(signal) = self.synthesis.recv() => {
                    for ev in self.output.accept(signal) {
                        self.dispatch(ev.into());
                    }
                    continue;
                },

                Some(ev) = self.completions.recv() => ev,
            };

            self.dispatch(event);
        }

        // Unmount: deactivate without telling the backend.
        self.dispatch(Command::Teardown.into());
        self.cancel.cancel();
        info!("Voice driver stopped");
        self.controller.telemetry.snapshot()
    }

    /// Step the controller with `event` and everything its effects feed back
    /// synchronously, then publish the new status.
    fn dispatch(&mut self, event: Event) {
        let mut queue = VecDeque::from([event]);
        while let Some(ev) = queue.pop_front() {
            for effect in self.controller.step(ev) {
                self.execute(effect, &mut queue);
            }
        }
        self.status_tx.send_replace(self.controller.status());
    }

    fn execute(&mut self, effect: SideEffect, queue: &mut VecDeque<Event>) {
        match effect {
            SideEffect::StartListening(gate) => match self.input.start(gate) {
                Ok(StartOutcome::Started(pass)) => debug!("Listening on pass {:?}", pass),
                Ok(StartOutcome::Rejected(reason)) => debug!("Listen rejected: {:?}", reason),
                Err(e) => {
                    warn!("Recognition failed to start: {}", e);
                    queue.push_back(Event::Input(InputEvent::Failed(RecognitionFailure {
                        recoverable: false,
                        message: e.to_string(),
                    })));
                }
            },

            SideEffect::StopListening => self.input.stop(),

            SideEffect::Speak(text) => {
                for ev in self.output.speak(&text) {
                    queue.push_back(ev.into());
                }
            }

            SideEffect::StopSpeaking => {
                if let Some(ev) = self.output.stop() {
                    queue.push_back(ev.into());
                }
            }

            SideEffect::ScheduleRestart { epoch, delay } => {
                let tx = self.completion_tx.clone();
                let cancel = self.cancel.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        _ = cancel.cancelled() => {}
                        _ = tokio::time::sleep(delay) => {
                            let _ = tx.send(Event::RestartDue { epoch });
                        }
                    }
                });
            }

            SideEffect::ProcessText { epoch, session_id, text, is_final } => {
                let backend = self.backend.clone();
                let tx = self.completion_tx.clone();
                tokio::spawn(async move {
                    let outcome = backend.process_text(&session_id, &text, is_final).await;
                    // The controller checks liveness when this lands.
                    let _ = tx.send(Event::ProcessReplied { epoch, outcome });
                });
            }

            SideEffect::Confirm { epoch, session_id, confirmed } => {
                let backend = self.backend.clone();
                let tx = self.completion_tx.clone();
                tokio::spawn(async move {
                    let outcome = backend.confirm(session_id.as_deref(), confirmed).await;
                    let _ = tx.send(Event::ConfirmReplied { epoch, outcome });
                });
            }

            SideEffect::ResetBackend { session_id } => {
                let backend = self.backend.clone();
                tokio::spawn(async move {
                    match backend.reset_voice_state(&session_id).await {
                        Ok(reply) => debug!("Backend voice state reset: {}", reply.status),
                        Err(e) => warn!("Failed to reset backend voice state: {}", e),
                    }
                });
            }

            SideEffect::ReadyForPlanning(prompt) => self.hooks.on_ready_for_planning(&prompt),
            SideEffect::ModeChanged { from, to } => self.hooks.on_mode_change(from, to),
            SideEffect::ReportError(message) => self.hooks.on_error(&message),
        }
    }
}
