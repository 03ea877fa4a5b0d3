//! Speech input channel: continuous speech-to-text capture.
//!
//! The platform recogniser sits behind [`RecognitionEngine`]. Each call to
//! [`SpeechInputChannel::start`] opens a new recognition *pass*; the engine
//! reports back through a [`RecognitionSink`] tagged with that pass, so
//! signals from an aborted pass can never leak into the next one.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::SpeechError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PassId(pub u64);

/// Platform recognition error codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    NoSpeech,
    Aborted,
    AudioCapture,
    NotAllowed,
    Network,
    Other(String),
}

impl RecognitionErrorKind {
    /// No-speech timeouts and explicit aborts are retried silently.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RecognitionErrorKind::NoSpeech | RecognitionErrorKind::Aborted)
    }

    pub fn describe(&self) -> String {
        match self {
            RecognitionErrorKind::NoSpeech => "No speech was detected.".to_string(),
            RecognitionErrorKind::Aborted => "Speech recognition was aborted.".to_string(),
            RecognitionErrorKind::AudioCapture => {
                "No microphone was found or it could not be opened.".to_string()
            }
            RecognitionErrorKind::NotAllowed => "Microphone access was denied.".to_string(),
            RecognitionErrorKind::Network => {
                "Speech recognition failed because of a network problem.".to_string()
            }
            RecognitionErrorKind::Other(code) => format!("Speech recognition error: {}", code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionSignalKind {
    Started,
    Result { text: String, is_final: bool },
    Error(RecognitionErrorKind),
    End,
}

/// A raw notification from the recognition engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionSignal {
    pub pass: PassId,
    pub kind: RecognitionSignalKind,
}

/// Handle given to the engine for one pass.
#[derive(Debug, Clone)]
pub struct RecognitionSink {
    pass: PassId,
    tx: mpsc::UnboundedSender<RecognitionSignal>,
}

impl RecognitionSink {
    pub fn new(pass: PassId, tx: mpsc::UnboundedSender<RecognitionSignal>) -> Self {
        Self { pass, tx }
    }

    pub fn pass(&self) -> PassId {
        self.pass
    }

    /// Returns false once the receiving side is gone.
    pub fn send(&self, kind: RecognitionSignalKind) -> bool {
        self.tx.send(RecognitionSignal { pass: self.pass, kind }).is_ok()
    }

    pub fn started(&self) -> bool {
        self.send(RecognitionSignalKind::Started)
    }

    pub fn interim(&self, text: impl Into<String>) -> bool {
        self.send(RecognitionSignalKind::Result { text: text.into(), is_final: false })
    }

    pub fn final_transcript(&self, text: impl Into<String>) -> bool {
        self.send(RecognitionSignalKind::Result { text: text.into(), is_final: true })
    }

    pub fn error(&self, kind: RecognitionErrorKind) -> bool {
        self.send(RecognitionSignalKind::Error(kind))
    }

    pub fn end(&self) -> bool {
        self.send(RecognitionSignalKind::End)
    }
}

/// The platform speech-to-text capability.
pub trait RecognitionEngine: Send {
    /// Checked once when the channel is built.
    fn is_supported(&self) -> bool {
        true
    }

    /// Begin a recognition pass. Results, errors and the final `End` go to `sink`.
    fn begin(&mut self, sink: RecognitionSink) -> Result<(), SpeechError>;

    /// Abort the running pass, if any. Must not fail.
    fn abort(&mut self);
}

/// Controller-side conditions that must hold before the microphone opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListenGate {
    pub active: bool,
    pub speaking: bool,
    pub processing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Unsupported,
    Inactive,
    /// Opening the mic over our own voice makes the assistant hear itself.
    Speaking,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(PassId),
    Rejected(RejectReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionFailure {
    pub recoverable: bool,
    pub message: String,
}

/// Channel-level events delivered to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Started,
    Interim(String),
    /// Terminal transcript for the utterance. `promoted` marks a buffered
    /// interim delivered because the pass ended before finalising.
    Final { text: String, promoted: bool },
    /// The pass stopped without a usable transcript.
    Ended,
    Failed(RecognitionFailure),
}

#[derive(Debug)]
struct PassState {
    id: PassId,
    interim: String,
    finalized: bool,
}

pub struct SpeechInputChannel {
    engine: Box<dyn RecognitionEngine>,
    tx: mpsc::UnboundedSender<RecognitionSignal>,
    supported: bool,
    next_pass: u64,
    current: Option<PassState>,
}

impl SpeechInputChannel {
    pub fn new(
        engine: Box<dyn RecognitionEngine>,
        tx: mpsc::UnboundedSender<RecognitionSignal>,
    ) -> Self {
        let supported = engine.is_supported();
        if !supported {
            warn!("Speech recognition is not available on this platform");
        }
        Self {
            engine,
            tx,
            supported,
            next_pass: 0,
            current: None,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn is_listening(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_pass(&self) -> Option<PassId> {
        self.current.as_ref().map(|p| p.id)
    }

    /// Open a new recognition pass, tearing down any previous one first.
    pub fn start(&mut self, gate: ListenGate) -> Result<StartOutcome, SpeechError> {
        let reject = if !self.supported {
            Some(RejectReason::Unsupported)
        } else if !gate.active {
            Some(RejectReason::Inactive)
        } else if gate.speaking {
            Some(RejectReason::Speaking)
        } else if gate.processing {
            Some(RejectReason::Processing)
        } else {
            None
        };
        if let Some(reason) = reject {
            debug!("Recognition start rejected: {:?}", reason);
            return Ok(StartOutcome::Rejected(reason));
        }

        if let Some(prev) = self.current.take() {
            debug!("Aborting recognition pass {:?} before restart", prev.id);
            self.engine.abort();
        }

        self.next_pass += 1;
        let id = PassId(self.next_pass);
        let sink = RecognitionSink::new(id, self.tx.clone());
        self.engine.begin(sink)?;
        self.current = Some(PassState {
            id,
            interim: String::new(),
            finalized: false,
        });
        debug!("Recognition pass {:?} started", id);
        Ok(StartOutcome::Started(id))
    }

    /// Abort any in-progress capture. Idempotent.
    pub fn stop(&mut self) {
        if let Some(pass) = self.current.take() {
            debug!("Recognition pass {:?} stopped", pass.id);
            self.engine.abort();
        }
    }

    /// Translate a raw engine signal into a channel event.
    /// Signals from passes other than the current one are dropped.
    pub fn accept(&mut self, signal: RecognitionSignal) -> Option<InputEvent> {
        let pass = match self.current.as_mut() {
            Some(p) if p.id == signal.pass => p,
            _ => {
                debug!("Dropping signal from stale pass {:?}: {:?}", signal.pass, signal.kind);
                return None;
            }
        };

        match signal.kind {
            RecognitionSignalKind::Started => {
                debug!("Recognition pass {:?} capturing", pass.id);
                Some(InputEvent::Started)
            }
            RecognitionSignalKind::Result { text, is_final: false } => {
                if pass.finalized {
                    return None;
                }
                debug!("Interim transcript ({} chars)", text.len());
                pass.interim = text.clone();
                Some(InputEvent::Interim(text))
            }
            RecognitionSignalKind::Result { text, is_final: true } => {
                // At most one final per utterance.
                if pass.finalized {
                    debug!("Ignoring extra final transcript on pass {:?}", pass.id);
                    return None;
                }
                pass.finalized = true;
                pass.interim.clear();
                debug!("Final transcript ({} chars)", text.len());
                Some(InputEvent::Final { text, promoted: false })
            }
            RecognitionSignalKind::Error(kind) => {
                let closed = self.current.take();
                if kind.is_recoverable() {
                    if let Some(text) = closed.and_then(Self::pending_interim) {
                        debug!("Promoting interim after {:?}", kind);
                        return Some(InputEvent::Final { text, promoted: true });
                    }
                }
                debug!("Recognition error: {:?}", kind);
                Some(InputEvent::Failed(RecognitionFailure {
                    recoverable: kind.is_recoverable(),
                    message: kind.describe(),
                }))
            }
            RecognitionSignalKind::End => {
                let closed = self.current.take();
                match closed.and_then(Self::pending_interim) {
                    Some(text) => {
                        debug!("Pass ended before finalising; promoting interim");
                        Some(InputEvent::Final { text, promoted: true })
                    }
                    None => {
                        debug!("Recognition pass {:?} ended", signal.pass);
                        Some(InputEvent::Ended)
                    }
                }
            }
        }
    }

    fn pending_interim(pass: PassState) -> Option<String> {
        if pass.finalized || pass.interim.trim().is_empty() {
            None
        } else {
            Some(pass.interim)
        }
    }
}
