#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use pharmavoice::error::{BackendError, SpeechError};
use pharmavoice::kernel::mode::InteractionMode;
use pharmavoice::runtime::VoiceHooks;
use pharmavoice::services::backend::{
    BackendAction, ConfirmReply, ProcessReply, StatusReply, VoiceBackend,
};
use pharmavoice::speech::input::{RecognitionEngine, RecognitionSink};
use pharmavoice::speech::output::{SynthesisEngine, SynthesisSink, Utterance};
use pharmavoice::speech::voice::VoiceInfo;

// === Recognition ===

#[derive(Default)]
pub struct RecognizerLog {
    pub begins: usize,
    pub aborts: usize,
    pub sinks: Vec<RecognitionSink>,
}

impl RecognizerLog {
    pub fn last_sink(&self) -> RecognitionSink {
        self.sinks.last().cloned().expect("no recognition pass was started")
    }
}

/// Records every pass; the test drives results through the stored sinks.
pub struct FakeRecognizer {
    pub supported: bool,
    pub log: Arc<Mutex<RecognizerLog>>,
}

impl FakeRecognizer {
    pub fn new() -> (Self, Arc<Mutex<RecognizerLog>>) {
        let log = Arc::new(Mutex::new(RecognizerLog::default()));
        (Self { supported: true, log: log.clone() }, log)
    }

    pub fn unsupported() -> Self {
        Self { supported: false, log: Arc::default() }
    }
}

impl RecognitionEngine for FakeRecognizer {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn begin(&mut self, sink: RecognitionSink) -> Result<(), SpeechError> {
        let mut log = self.log.lock().unwrap();
        log.begins += 1;
        log.sinks.push(sink);
        Ok(())
    }

    fn abort(&mut self) {
        self.log.lock().unwrap().aborts += 1;
    }
}

// === Synthesis ===

#[derive(Default)]
pub struct SynthLog {
    pub spoken: Vec<Utterance>,
    pub cancels: usize,
    pub sink: Option<SynthesisSink>,
}

impl SynthLog {
    pub fn texts(&self) -> Vec<String> {
        self.spoken.iter().map(|u| u.text.clone()).collect()
    }
}

/// With `playback` set, every utterance starts at once and ends after that long.
/// Without it the test finishes utterances by hand through `sink`.
pub struct FakeSynthesizer {
    pub voices: Arc<Mutex<Vec<VoiceInfo>>>,
    pub playback: Option<Duration>,
    pub log: Arc<Mutex<SynthLog>>,
}

impl FakeSynthesizer {
    pub fn new(playback: Option<Duration>) -> (Self, Arc<Mutex<SynthLog>>) {
        let log = Arc::new(Mutex::new(SynthLog::default()));
        let synth = Self {
            voices: Arc::new(Mutex::new(Vec::new())),
            playback,
            log: log.clone(),
        };
        (synth, log)
    }
}

impl SynthesisEngine for FakeSynthesizer {
    fn attach(&mut self, sink: SynthesisSink) {
        self.log.lock().unwrap().sink = Some(sink);
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        self.voices.lock().unwrap().clone()
    }

    fn speak(&mut self, utterance: Utterance, sink: SynthesisSink) -> Result<(), SpeechError> {
        let id = utterance.id;
        self.log.lock().unwrap().spoken.push(utterance);
        if let Some(duration) = self.playback {
            tokio::spawn(async move {
                sink.started(id);
                tokio::time::sleep(duration).await;
                sink.ended(id);
            });
        }
        Ok(())
    }

    fn cancel(&mut self) {
        self.log.lock().unwrap().cancels += 1;
    }
}

// === Backend ===

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Process { session_id: String, text: String, is_final: bool },
    Confirm { session_id: Option<String>, confirmed: bool },
    Reset { session_id: String },
}

/// Scripted backend. Empty scripts answer with a plain `listen`.
#[derive(Default)]
pub struct FakeBackend {
    pub process: Mutex<VecDeque<Result<ProcessReply, BackendError>>>,
    pub confirm: Mutex<VecDeque<Result<ConfirmReply, BackendError>>>,
    pub calls: Mutex<Vec<BackendCall>>,
    pub latency: Duration,
}

impl FakeBackend {
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency, ..Self::default() }
    }

    pub fn push_process(&self, reply: Result<ProcessReply, BackendError>) {
        self.process.lock().unwrap().push_back(reply);
    }

    pub fn push_confirm(&self, reply: Result<ConfirmReply, BackendError>) {
        self.confirm.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VoiceBackend for FakeBackend {
    async fn process_text(
        &self,
        session_id: &str,
        text: &str,
        is_final: bool,
    ) -> Result<ProcessReply, BackendError> {
        self.calls.lock().unwrap().push(BackendCall::Process {
            session_id: session_id.to_string(),
            text: text.to_string(),
            is_final,
        });
        tokio::time::sleep(self.latency).await;
        let next = self.process.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(ProcessReply::default()))
    }

    async fn confirm(
        &self,
        session_id: Option<&str>,
        confirmed: bool,
    ) -> Result<ConfirmReply, BackendError> {
        self.calls.lock().unwrap().push(BackendCall::Confirm {
            session_id: session_id.map(str::to_string),
            confirmed,
        });
        tokio::time::sleep(self.latency).await;
        let next = self.confirm.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(ConfirmReply::default()))
    }

    async fn reset_voice_state(&self, session_id: &str) -> Result<StatusReply, BackendError> {
        self.calls.lock().unwrap().push(BackendCall::Reset { session_id: session_id.to_string() });
        Ok(StatusReply { status: "ok".to_string() })
    }
}

// === Hooks ===

#[derive(Default)]
pub struct RecordingHooks {
    pub modes: Mutex<Vec<InteractionMode>>,
    pub planned: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl RecordingHooks {
    pub fn planned(&self) -> Vec<String> {
        self.planned.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn modes(&self) -> Vec<InteractionMode> {
        self.modes.lock().unwrap().clone()
    }
}

impl VoiceHooks for RecordingHooks {
    fn on_mode_change(&self, _from: InteractionMode, to: InteractionMode) {
        self.modes.lock().unwrap().push(to);
    }

    fn on_ready_for_planning(&self, prompt: &str) {
        self.planned.lock().unwrap().push(prompt.to_string());
    }

    fn on_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

// === Reply builders ===

pub fn reply(action: BackendAction, voice: Option<&str>) -> ProcessReply {
    ProcessReply {
        status: "ok".to_string(),
        action,
        voice_response: voice.map(str::to_string),
        refined_prompt: None,
    }
}

pub fn refined_reply(action: BackendAction, voice: Option<&str>, refined: &str) -> ProcessReply {
    ProcessReply {
        refined_prompt: Some(refined.to_string()),
        ..reply(action, voice)
    }
}

pub fn confirm_reply(ready: bool, voice: Option<&str>, refined: Option<&str>) -> ConfirmReply {
    ConfirmReply {
        status: "ok".to_string(),
        ready_for_planning: Some(ready),
        voice_response: voice.map(str::to_string),
        refined_prompt: refined.map(str::to_string),
    }
}
