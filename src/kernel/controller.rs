use tracing::{debug, info, warn};

use super::effect::SideEffect;
use super::event::{Command, Event};
use super::mode::{InteractionMode, ModeGraph};
use super::state::{DialogueState, VoiceStatus};
use super::stopwords::{contains_stop_word, is_standalone_stop};
use super::telemetry::event::{
    DispatchKind, FailureKind, InterruptionKind, LifecycleEvent, StaleSource, TelemetryEvent,
};
use super::telemetry::recorder::TelemetryRecorder;
use super::time::{Epoch, RestartDelays};
use crate::error::BackendError;
use crate::services::backend::types::{BackendAction, ConfirmReply, ProcessReply};
use crate::speech::input::{InputEvent, ListenGate, RecognitionFailure};
use crate::speech::output::OutputEvent;

pub const BOOTSTRAP_ACK: &str = "I'll analyze that for you.";
pub const PLANNING_ACK: &str = "Starting the analysis now.";
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";
pub const UNSUPPORTED: &str = "Speech recognition is not supported in this environment.";
const BACKEND_ERROR_ACTION: &str = "The assistant could not process that request.";

#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerConfig {
    pub delays: RestartDelays,
}

/// The outstanding backend call, if any. At most one exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InFlight {
    Process(Epoch),
    Confirm { epoch: Epoch, confirmed: bool },
}

/// The dialogue state machine.
///
/// Pure: `step` consumes one event and returns the side effects to run.
/// It never awaits, never touches a channel and never calls the network.
pub struct DialogueController {
    pub state: DialogueState,
    pub telemetry: TelemetryRecorder,
    config: ControllerConfig,
    dispatch_epoch: Epoch,
    restart_epoch: Epoch,
    in_flight: Option<InFlight>,
}

impl DialogueController {
    pub fn new(input_supported: bool, config: ControllerConfig) -> Self {
        Self {
            state: DialogueState::new(input_supported),
            telemetry: TelemetryRecorder::new(),
            config,
            dispatch_epoch: Epoch::new(),
            restart_epoch: Epoch::new(),
            in_flight: None,
        }
    }

    pub fn status(&self) -> VoiceStatus {
        self.state.status()
    }

    pub fn mode(&self) -> InteractionMode {
        self.state.mode
    }

    pub fn gate(&self) -> ListenGate {
        ListenGate {
            active: self.state.active,
            speaking: self.state.speaking,
            processing: self.state.processing,
        }
    }

    pub fn step(&mut self, event: Event) -> Vec<SideEffect> {
        let mut fx = Vec::new();
        match event {
            Event::Command(cmd) => self.on_command(cmd, &mut fx),
            Event::Input(ev) => self.on_input(ev, &mut fx),
            Event::Output(ev) => self.on_output(ev, &mut fx),
            Event::ProcessReplied { epoch, outcome } => self.on_process_reply(epoch, outcome, &mut fx),
            Event::ConfirmReplied { epoch, outcome } => self.on_confirm_reply(epoch, outcome, &mut fx),
            Event::RestartDue { epoch } => self.on_restart_due(epoch, &mut fx),
        }
        fx
    }

    // === Commands ===

    fn on_command(&mut self, cmd: Command, fx: &mut Vec<SideEffect>) {
        match cmd {
            Command::Activate => self.activate(fx),
            Command::Deactivate => self.deactivate(true, fx),
            Command::Toggle => {
                if self.state.active {
                    self.deactivate(true, fx)
                } else {
                    self.activate(fx)
                }
            }
            Command::StopSpeaking => {
                if self.state.speaking {
                    self.telemetry.record(TelemetryEvent::Interruption(InterruptionKind::ExplicitStop));
                    fx.push(SideEffect::StopSpeaking);
                }
            }
            Command::ConfirmPrompt(confirmed) => self.confirm_prompt(confirmed, fx),
            Command::Reset => {
                self.deactivate(true, fx);
                self.state.clear_transient();
                self.telemetry.record(TelemetryEvent::Lifecycle(LifecycleEvent::Reset));
                if let Some(session_id) = self.state.session_id.clone() {
                    fx.push(SideEffect::ResetBackend { session_id });
                }
            }
            Command::Teardown => self.deactivate(true, fx),
            Command::SessionChanged(session_id) => {
                debug!("Session changed; voice activity kept");
                self.state.session_id = session_id;
            }
        }
    }

    fn activate(&mut self, fx: &mut Vec<SideEffect>) {
        if self.state.active {
            debug!("Activate ignored: already active");
            return;
        }
        if !self.state.supported {
            warn!("Activation refused: recognition unsupported");
            self.telemetry.record(TelemetryEvent::Lifecycle(LifecycleEvent::ActivationRefused));
            self.fail(UNSUPPORTED.to_string(), fx);
            return;
        }

        info!("Voice assistant activated");
        self.telemetry.record(TelemetryEvent::Lifecycle(LifecycleEvent::Activated));
        self.state.active = true;
        self.state.error = None;
        self.set_mode(InteractionMode::Listening, fx);
        self.start_listening(fx);
    }

    /// `halt_output` is false only when a closing utterance must be allowed to finish.
    fn deactivate(&mut self, halt_output: bool, fx: &mut Vec<SideEffect>) {
        let stoppable = halt_output && self.state.speaking;
        if !self.state.active && self.state.mode == InteractionMode::Idle && !self.state.listening && !stoppable {
            debug!("Deactivate ignored: already idle");
            return;
        }

        info!("Voice assistant deactivated");
        self.telemetry.record(TelemetryEvent::Lifecycle(LifecycleEvent::Deactivated));
        self.state.active = false;
        self.state.processing = false;
        self.in_flight = None;
        // Invalidate pending restart timers.
        self.restart_epoch = self.restart_epoch.next();

        fx.push(SideEffect::StopListening);
        self.state.listening = false;
        if stoppable {
            // Stopping counts as ended; no dangling speaking state.
            self.state.speaking = false;
            fx.push(SideEffect::StopSpeaking);
        }
        self.set_mode(InteractionMode::Idle, fx);
    }

    fn confirm_prompt(&mut self, confirmed: bool, fx: &mut Vec<SideEffect>) {
        if !self.state.active {
            warn!("Confirmation ignored: voice assistant inactive");
            return;
        }
        if !self.state.awaiting_confirmation {
            warn!("Confirmation ignored: nothing awaiting confirmation");
            return;
        }
        if self.state.processing {
            warn!("Confirmation ignored: a backend call is already in flight");
            self.telemetry.record(TelemetryEvent::DispatchDropped);
            return;
        }

        let epoch = self.next_dispatch_epoch();
        self.in_flight = Some(InFlight::Confirm { epoch, confirmed });
        self.state.processing = true;
        self.close_microphone(fx);
        self.set_mode(InteractionMode::Processing, fx);
        self.telemetry.record(TelemetryEvent::Dispatch { epoch, kind: DispatchKind::Confirm });
        fx.push(SideEffect::Confirm {
            epoch,
            session_id: self.state.session_id.clone(),
            confirmed,
        });
    }

    // === Speech input ===

    fn on_input(&mut self, ev: InputEvent, fx: &mut Vec<SideEffect>) {
        match ev {
            InputEvent::Started => debug!("Recognition capturing"),
            InputEvent::Interim(text) => {
                if self.state.active {
                    self.state.interim_transcript = text;
                }
            }
            InputEvent::Final { text, promoted } => {
                if promoted {
                    debug!("Dispatching promoted interim transcript");
                }
                self.on_final(text, fx);
            }
            InputEvent::Ended => {
                self.state.listening = false;
                self.restart_if_idle(fx);
            }
            InputEvent::Failed(RecognitionFailure { recoverable, message }) => {
                self.state.listening = false;
                if recoverable {
                    debug!("Recoverable recognition failure: {}", message);
                    self.telemetry.record(TelemetryEvent::Failure(FailureKind::RecognitionRecoverable));
                    self.restart_if_idle(fx);
                } else {
                    warn!("Recognition failed: {}", message);
                    self.telemetry.record(TelemetryEvent::Failure(FailureKind::RecognitionFatal));
                    self.fail(message, fx);
                }
            }
        }
    }

    fn on_final(&mut self, text: String, fx: &mut Vec<SideEffect>) {
        if !self.state.active {
            debug!("Final transcript ignored: inactive");
            return;
        }
        if self.state.processing {
            warn!("Final transcript dropped: a dispatch is already in flight");
            self.telemetry.record(TelemetryEvent::DispatchDropped);
            return;
        }

        let text = text.trim().to_string();
        if text.is_empty() {
            self.restart_if_idle(fx);
            return;
        }

        self.state.interim_transcript.clear();
        self.state.transcript = text.clone();

        if self.state.speaking {
            if contains_stop_word(&text) {
                info!("Barge-in: halting playback");
                self.telemetry.record(TelemetryEvent::Interruption(InterruptionKind::BargeIn));
                // Playback end schedules the settle restart.
                fx.push(SideEffect::StopSpeaking);
                return;
            }
        } else if is_standalone_stop(&text) {
            debug!("Standalone stop word swallowed");
            self.telemetry.record(TelemetryEvent::Interruption(InterruptionKind::StopWordSwallowed));
            self.schedule_restart(self.config.delays.recovery, fx);
            return;
        }

        self.dispatch(text, fx);
    }

    fn dispatch(&mut self, text: String, fx: &mut Vec<SideEffect>) {
        if !self.state.awaiting_confirmation {
            self.state.refined_prompt = None;
        }
        self.state.processing = true;
        self.close_microphone(fx);
        self.set_mode(InteractionMode::Processing, fx);

        match self.state.session_id.clone() {
            None => {
                // Brand-new chat: no backend session to talk to yet.
                info!("No session; handing transcript straight to planning");
                self.state.processing = false;
                self.telemetry.record(TelemetryEvent::PlanningHandoff { bootstrap: true });
                fx.push(SideEffect::ReadyForPlanning(text));
                self.speak(BOOTSTRAP_ACK.to_string(), fx);
            }
            Some(session_id) => {
                let epoch = self.next_dispatch_epoch();
                self.in_flight = Some(InFlight::Process(epoch));
                self.telemetry.record(TelemetryEvent::Dispatch { epoch, kind: DispatchKind::ProcessText });
                fx.push(SideEffect::ProcessText {
                    epoch,
                    session_id,
                    text,
                    is_final: true,
                });
            }
        }
    }

    // === Backend replies ===

    fn take_in_flight(&mut self, expected: impl Fn(&InFlight) -> bool) -> Option<InFlight> {
        if !self.state.active {
            return None;
        }
        match self.in_flight {
            Some(f) if expected(&f) => {
                self.in_flight = None;
                self.state.processing = false;
                Some(f)
            }
            _ => None,
        }
    }

    fn on_process_reply(
        &mut self,
        epoch: Epoch,
        outcome: Result<ProcessReply, BackendError>,
        fx: &mut Vec<SideEffect>,
    ) {
        if self.take_in_flight(|f| *f == InFlight::Process(epoch)).is_none() {
            warn!("Discarding stale process reply for epoch {:?}", epoch);
            self.telemetry.record(TelemetryEvent::StaleDiscarded { epoch, source: StaleSource::ProcessReply });
            return;
        }

        let reply = match outcome {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Voice backend call failed: {}", e);
                self.telemetry.record(TelemetryEvent::Failure(FailureKind::Backend));
                self.fail(e.to_string(), fx);
                self.speak(APOLOGY.to_string(), fx);
                return;
            }
        };

        debug!("Backend action: {:?}", reply.action);
        if let Some(refined) = reply.refined() {
            self.state.refined_prompt = Some(refined.to_string());
        }
        let spoken = reply.spoken_text().map(str::to_string);

        match reply.action {
            BackendAction::ForwardToPlanning => {
                self.state.awaiting_confirmation = false;
                let prompt = self
                    .state
                    .refined_prompt
                    .take()
                    .unwrap_or_else(|| self.state.transcript.clone());
                self.speak(spoken.unwrap_or_else(|| PLANNING_ACK.to_string()), fx);
                self.telemetry.record(TelemetryEvent::PlanningHandoff { bootstrap: false });
                fx.push(SideEffect::ReadyForPlanning(prompt));
            }
            BackendAction::ConfirmPrompt => {
                self.state.awaiting_confirmation = true;
                self.set_mode(InteractionMode::AwaitingConfirmation, fx);
                self.speak_or_listen(spoken, fx);
            }
            BackendAction::StopSpeaking => {
                if self.state.speaking {
                    fx.push(SideEffect::StopSpeaking);
                } else {
                    self.start_listening(fx);
                }
            }
            BackendAction::Reset => {
                self.state.transcript.clear();
                self.state.refined_prompt = None;
                self.state.awaiting_confirmation = false;
                self.speak_or_listen(spoken, fx);
            }
            BackendAction::Error => {
                self.telemetry.record(TelemetryEvent::Failure(FailureKind::BackendErrorAction));
                let message = spoken.clone().unwrap_or_else(|| BACKEND_ERROR_ACTION.to_string());
                self.fail(message, fx);
                self.speak(spoken.unwrap_or_else(|| APOLOGY.to_string()), fx);
            }
            BackendAction::AskClarification
            | BackendAction::Speak
            | BackendAction::Acknowledge
            | BackendAction::Listen
            | BackendAction::Unknown => self.speak_or_listen(spoken, fx),
        }
    }

    fn on_confirm_reply(
        &mut self,
        epoch: Epoch,
        outcome: Result<ConfirmReply, BackendError>,
        fx: &mut Vec<SideEffect>,
    ) {
        let confirmed = match self.take_in_flight(|f| matches!(f, InFlight::Confirm { epoch: e, .. } if *e == epoch)) {
            Some(InFlight::Confirm { confirmed, .. }) => confirmed,
            _ => {
                warn!("Discarding stale confirm reply for epoch {:?}", epoch);
                self.telemetry.record(TelemetryEvent::StaleDiscarded { epoch, source: StaleSource::ConfirmReply });
                return;
            }
        };

        let reply = match outcome {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Confirmation call failed: {}", e);
                self.telemetry.record(TelemetryEvent::Failure(FailureKind::Backend));
                self.fail(e.to_string(), fx);
                self.start_listening(fx);
                return;
            }
        };

        if confirmed && reply.is_ready() {
            self.state.awaiting_confirmation = false;
            let prompt = reply
                .refined()
                .map(str::to_string)
                .or_else(|| self.state.refined_prompt.take())
                .unwrap_or_else(|| self.state.transcript.clone());
            self.state.refined_prompt = None;
            if let Some(text) = reply.spoken_text() {
                self.speak(text.to_string(), fx);
            }
            self.telemetry.record(TelemetryEvent::PlanningHandoff { bootstrap: false });
            fx.push(SideEffect::ReadyForPlanning(prompt));
            // The confirmed hand-off ends the voice session; let the last line play out.
            self.deactivate(false, fx);
        } else {
            self.state.awaiting_confirmation = false;
            self.state.refined_prompt = None;
            self.speak_or_listen(reply.spoken_text().map(str::to_string), fx);
        }
    }

    // === Speech output ===

    fn on_output(&mut self, ev: OutputEvent, fx: &mut Vec<SideEffect>) {
        match ev {
            OutputEvent::Started => {
                debug!("Playback started");
                self.state.speaking = true;
            }
            OutputEvent::Ended | OutputEvent::Failed(_) => {
                if let OutputEvent::Failed(msg) = &ev {
                    // Benign: carry on as if playback completed.
                    warn!("Playback failed: {}", msg);
                    self.telemetry.record(TelemetryEvent::Failure(FailureKind::Synthesis));
                }
                if !self.state.speaking {
                    debug!("Playback end with nothing playing");
                }
                self.state.speaking = false;
                if self.state.active && !self.state.processing {
                    self.schedule_restart(self.config.delays.settle, fx);
                }
            }
        }
    }

    // === Timers ===

    fn on_restart_due(&mut self, epoch: Epoch, fx: &mut Vec<SideEffect>) {
        if epoch != self.restart_epoch {
            debug!("Ignoring superseded restart {:?}", epoch);
            self.telemetry.record(TelemetryEvent::StaleDiscarded { epoch, source: StaleSource::RestartTimer });
            return;
        }
        if !self.state.active {
            return;
        }
        self.start_listening(fx);
    }

    // === Helpers ===

    fn next_dispatch_epoch(&mut self) -> Epoch {
        self.dispatch_epoch = self.dispatch_epoch.next();
        self.dispatch_epoch
    }

    /// Mode to show while the loop is open: confirmation outranks listening/speaking.
    fn open_mode(&self, fallback: InteractionMode) -> InteractionMode {
        if self.state.awaiting_confirmation {
            InteractionMode::AwaitingConfirmation
        } else {
            fallback
        }
    }

    fn set_mode(&mut self, to: InteractionMode, fx: &mut Vec<SideEffect>) {
        let from = self.state.mode;
        if from == to {
            return;
        }
        if !ModeGraph::is_expected(from, to) {
            warn!("Unexpected mode transition {} -> {}", from, to);
        }
        info!("Mode: {} -> {}", from, to);
        self.telemetry.record(TelemetryEvent::ModeTransition { from, to });
        self.state.mode = to;
        fx.push(SideEffect::ModeChanged { from, to });
    }

    fn start_listening(&mut self, fx: &mut Vec<SideEffect>) {
        if !self.state.active || self.state.speaking || self.state.processing {
            debug!("Listen deferred: {:?}", self.gate());
            return;
        }
        // A direct start supersedes any pending timer.
        self.restart_epoch = self.restart_epoch.next();
        self.state.listening = true;
        self.state.interim_transcript.clear();
        let mode = self.open_mode(InteractionMode::Listening);
        self.set_mode(mode, fx);
        fx.push(SideEffect::StartListening(self.gate()));
    }

    fn close_microphone(&mut self, fx: &mut Vec<SideEffect>) {
        if self.state.listening {
            self.state.listening = false;
            fx.push(SideEffect::StopListening);
        }
    }

    fn schedule_restart(&mut self, delay: std::time::Duration, fx: &mut Vec<SideEffect>) {
        self.restart_epoch = self.restart_epoch.next();
        self.telemetry.record(TelemetryEvent::RestartScheduled { delay_ms: delay.as_millis() as u64 });
        fx.push(SideEffect::ScheduleRestart { epoch: self.restart_epoch, delay });
    }

    fn restart_if_idle(&mut self, fx: &mut Vec<SideEffect>) {
        if self.state.active && !self.state.processing && !self.state.speaking {
            self.schedule_restart(self.config.delays.recovery, fx);
        }
    }

    fn speak(&mut self, text: String, fx: &mut Vec<SideEffect>) {
        // Never leave the mic open over our own voice.
        self.close_microphone(fx);
        self.state.speaking = true;
        self.state.last_response = text.clone();
        let mode = self.open_mode(InteractionMode::Speaking);
        self.set_mode(mode, fx);
        fx.push(SideEffect::Speak(text));
    }

    fn speak_or_listen(&mut self, text: Option<String>, fx: &mut Vec<SideEffect>) {
        match text {
            Some(text) => self.speak(text, fx),
            None => self.start_listening(fx),
        }
    }

    fn fail(&mut self, message: String, fx: &mut Vec<SideEffect>) {
        self.state.error = Some(message.clone());
        fx.push(SideEffect::ReportError(message));
    }
}
