//! Speech output channel: text-to-speech playback.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::voice::{select_voice, VoiceInfo};
use crate::error::SpeechError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UtteranceId(pub u64);

/// Stable playback parameters applied to every utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechSettings {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
    pub lang: String,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            lang: "en-US".to_string(),
        }
    }
}

/// One request to the synthesis engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub settings: SpeechSettings,
    /// `None` means the platform default voice.
    pub voice: Option<VoiceInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisSignal {
    Started(UtteranceId),
    Ended(UtteranceId),
    Failed(UtteranceId, String),
    /// The platform voice list changed (voices often load late).
    VoicesChanged,
}

#[derive(Debug, Clone)]
pub struct SynthesisSink {
    tx: mpsc::UnboundedSender<SynthesisSignal>,
}

impl SynthesisSink {
    pub fn new(tx: mpsc::UnboundedSender<SynthesisSignal>) -> Self {
        Self { tx }
    }

    pub fn started(&self, id: UtteranceId) -> bool {
        self.tx.send(SynthesisSignal::Started(id)).is_ok()
    }

    pub fn ended(&self, id: UtteranceId) -> bool {
        self.tx.send(SynthesisSignal::Ended(id)).is_ok()
    }

    pub fn failed(&self, id: UtteranceId, message: impl Into<String>) -> bool {
        self.tx.send(SynthesisSignal::Failed(id, message.into())).is_ok()
    }

    pub fn voices_changed(&self) -> bool {
        self.tx.send(SynthesisSignal::VoicesChanged).is_ok()
    }
}

/// The platform text-to-speech capability.
pub trait SynthesisEngine: Send {
    fn is_supported(&self) -> bool {
        true
    }

    /// Called once with the channel's sink, e.g. to report `VoicesChanged` later.
    fn attach(&mut self, _sink: SynthesisSink) {}

    /// Voices currently known to the platform. May be empty early on.
    fn voices(&self) -> Vec<VoiceInfo>;

    /// Start playback. Lifecycle goes to `sink` tagged with `utterance.id`.
    fn speak(&mut self, utterance: Utterance, sink: SynthesisSink) -> Result<(), SpeechError>;

    /// Halt playback immediately. Must not fail.
    fn cancel(&mut self);
}

/// Channel-level events delivered to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    Started,
    Ended,
    /// Treated like `Ended` by the controller; silence must not strand the user.
    Failed(String),
}

#[derive(Debug)]
struct Playback {
    id: UtteranceId,
    started: bool,
}

pub struct SpeechOutputChannel {
    engine: Box<dyn SynthesisEngine>,
    sink: SynthesisSink,
    settings: SpeechSettings,
    supported: bool,
    selected_voice: Option<VoiceInfo>,
    next_id: u64,
    current: Option<Playback>,
}

impl SpeechOutputChannel {
    pub fn new(
        mut engine: Box<dyn SynthesisEngine>,
        tx: mpsc::UnboundedSender<SynthesisSignal>,
        settings: SpeechSettings,
    ) -> Self {
        let supported = engine.is_supported();
        let sink = SynthesisSink::new(tx);
        engine.attach(sink.clone());
        if !supported {
            warn!("Speech synthesis is not available on this platform");
        }
        let mut channel = Self {
            engine,
            sink,
            settings,
            supported,
            selected_voice: None,
            next_id: 0,
            current: None,
        };
        channel.refresh_voices();
        channel
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn is_speaking(&self) -> bool {
        self.current.is_some()
    }

    pub fn selected_voice(&self) -> Option<&VoiceInfo> {
        self.selected_voice.as_ref()
    }

    /// Re-run voice selection against the platform list.
    pub fn refresh_voices(&mut self) {
        let voices = self.engine.voices();
        let chosen = select_voice(&voices);
        if chosen != self.selected_voice {
            match &chosen {
                Some(v) => info!("Selected voice: {} ({})", v.name, v.lang),
                None => debug!("No preferred voice among {} available; using default", voices.len()),
            }
            self.selected_voice = chosen;
        }
    }

    /// Speak `text`, cancelling anything already playing.
    ///
    /// Returns events that are already known: empty text completes at once,
    /// engine refusal fails at once. Otherwise events arrive via `accept`.
    pub fn speak(&mut self, text: &str) -> Vec<OutputEvent> {
        if text.trim().is_empty() {
            debug!("Empty utterance; completing immediately");
            return vec![OutputEvent::Ended];
        }
        if !self.supported {
            return vec![OutputEvent::Failed(
                "speech synthesis is not supported on this platform".to_string(),
            )];
        }

        if let Some(prev) = self.current.take() {
            debug!("Cancelling utterance {:?} for a new one", prev.id);
            self.engine.cancel();
        }

        self.next_id += 1;
        let id = UtteranceId(self.next_id);
        let utterance = Utterance {
            id,
            text: text.to_string(),
            settings: self.settings.clone(),
            voice: self.selected_voice.clone(),
        };

        match self.engine.speak(utterance, self.sink.clone()) {
            Ok(()) => {
                debug!("Utterance {:?} queued ({} chars)", id, text.len());
                self.current = Some(Playback { id, started: false });
                Vec::new()
            }
            Err(e) => {
                warn!("Synthesis failed to start: {}", e);
                vec![OutputEvent::Failed(e.to_string())]
            }
        }
    }

    /// Halt playback. Returns the end notification only if something was playing.
    pub fn stop(&mut self) -> Option<OutputEvent> {
        let playback = self.current.take()?;
        debug!("Utterance {:?} stopped", playback.id);
        self.engine.cancel();
        Some(OutputEvent::Ended)
    }

    /// Translate an engine signal into channel events, enforcing start-before-end
    /// and exactly one terminal event per utterance.
    pub fn accept(&mut self, signal: SynthesisSignal) -> Vec<OutputEvent> {
        let (id, terminal) = match signal {
            SynthesisSignal::VoicesChanged => {
                self.refresh_voices();
                return Vec::new();
            }
            SynthesisSignal::Started(id) => (id, None),
            SynthesisSignal::Ended(id) => (id, Some(OutputEvent::Ended)),
            SynthesisSignal::Failed(id, msg) => (id, Some(OutputEvent::Failed(msg))),
        };

        let playback = match self.current.as_mut() {
            Some(p) if p.id == id => p,
            _ => {
                debug!("Dropping signal for stale utterance {:?}", id);
                return Vec::new();
            }
        };

        let mut events = Vec::new();
        if !playback.started {
            playback.started = true;
            events.push(OutputEvent::Started);
        }

        match terminal {
            Some(ev) => {
                debug!("Utterance {:?} finished: {:?}", id, ev);
                self.current = None;
                events.push(ev);
            }
            None => debug!("Utterance {:?} playing", id),
        }
        events
    }
}
