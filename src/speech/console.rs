//! Terminal-backed engines: typed lines stand in for recognised speech and an
//! external command (`say`, `espeak`) does the talking.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::input::{RecognitionEngine, RecognitionErrorKind, RecognitionSink};
use super::output::{SynthesisEngine, SynthesisSink, Utterance};
use super::voice::VoiceInfo;
use crate::error::SpeechError;

/// Words per minute `say` and `espeak` use at rate 1.0.
const BASE_WPM: f32 = 175.0;

/// Treats each line from `lines` as a final transcript.
pub struct LineRecognizer {
    lines: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>>,
    silence_timeout: Duration,
    task: Option<JoinHandle<()>>,
}

impl LineRecognizer {
    pub fn new(lines: mpsc::UnboundedReceiver<String>, silence_timeout: Duration) -> Self {
        Self {
            lines: Arc::new(tokio::sync::Mutex::new(lines)),
            silence_timeout,
            task: None,
        }
    }
}

impl RecognitionEngine for LineRecognizer {
    fn begin(&mut self, sink: RecognitionSink) -> Result<(), SpeechError> {
        self.abort();
        let lines = self.lines.clone();
        let timeout = self.silence_timeout;

        self.task = Some(tokio::spawn(async move {
            sink.started();
            let mut lines = lines.lock().await;
            match tokio::time::timeout(timeout, lines.recv()).await {
                Ok(Some(line)) => {
                    sink.final_transcript(line);
                }
                Ok(None) => {
                    sink.error(RecognitionErrorKind::Other("input closed".to_string()));
                }
                Err(_) => {
                    sink.error(RecognitionErrorKind::NoSpeech);
                }
            }
            sink.end();
        }));
        Ok(())
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Say,
    Espeak,
    Plain,
}

/// Speaks through an external text-to-speech process.
/// The child is killed on cancel and on drop.
pub struct CommandSynthesizer {
    command: String,
    flavor: Flavor,
    voices: Arc<Mutex<Vec<VoiceInfo>>>,
    stop: Option<oneshot::Sender<()>>,
}

impl CommandSynthesizer {
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        let program = command.rsplit('/').next().unwrap_or(&command).to_string();
        let flavor = match program.as_str() {
            "say" => Flavor::Say,
            "espeak" | "espeak-ng" => Flavor::Espeak,
            _ => Flavor::Plain,
        };
        Self {
            command,
            flavor,
            voices: Arc::new(Mutex::new(Vec::new())),
            stop: None,
        }
    }

    fn args(&self, utterance: &Utterance) -> Vec<String> {
        let s = &utterance.settings;
        let wpm = ((BASE_WPM * s.rate).round() as u32).max(1).to_string();
        let mut args = Vec::new();
        match self.flavor {
            Flavor::Say => {
                if let Some(v) = &utterance.voice {
                    args.push("-v".to_string());
                    args.push(v.name.clone());
                }
                args.push("-r".to_string());
                args.push(wpm);
            }
            Flavor::Espeak => {
                args.push("-v".to_string());
                args.push(s.lang.to_lowercase());
                args.push("-s".to_string());
                args.push(wpm);
                args.push("-p".to_string());
                args.push(((s.pitch * 50.0).round() as u32).min(99).to_string());
                args.push("-a".to_string());
                args.push(((s.volume * 100.0).round() as u32).min(200).to_string());
            }
            Flavor::Plain => {
                args.push(utterance.text.clone());
                return args;
            }
        }
        args.push("--".to_string());
        args.push(utterance.text.clone());
        args
    }
}

impl SynthesisEngine for CommandSynthesizer {
    fn attach(&mut self, sink: SynthesisSink) {
        if self.flavor != Flavor::Say {
            return;
        }
        let voices = self.voices.clone();
        let command = self.command.clone();
        tokio::spawn(async move {
            match tokio::process::Command::new(&command).args(["-v", "?"]).output().await {
                Ok(out) if out.status.success() => {
                    let parsed = parse_say_voices(&String::from_utf8_lossy(&out.stdout));
                    debug!("Found {} voices", parsed.len());
                    if let Ok(mut v) = voices.lock() {
                        *v = parsed;
                    }
                    sink.voices_changed();
                }
                Ok(out) => warn!("Voice probe exited with {}", out.status),
                Err(e) => warn!("Voice probe failed: {}", e),
            }
        });
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        self.voices.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn speak(&mut self, utterance: Utterance, sink: SynthesisSink) -> Result<(), SpeechError> {
        self.cancel();

        let mut child = tokio::process::Command::new(&self.command)
            .args(self.args(&utterance))
            .kill_on_drop(true)
            .spawn()?;

        let (stop_tx, mut stop_rx) = oneshot::channel();
        self.stop = Some(stop_tx);
        let id = utterance.id;

        tokio::spawn(async move {
            sink.started(id);
            tokio::select! {
                status = child.wait() => match status {
                    Ok(s) if s.success() => { sink.ended(id); }
                    Ok(s) => { sink.failed(id, format!("speech command exited with {}", s)); }
                    Err(e) => { sink.failed(id, e.to_string()); }
                },
                _ = &mut stop_rx => {
                    let _ = child.kill().await;
                }
            }
        });
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

/// Parse `say -v ?` output: `Name   xx_YY   # sample sentence`.
pub fn parse_say_voices(raw: &str) -> Vec<VoiceInfo> {
    raw.lines()
        .filter_map(|line| {
            let left = line.split('#').next()?.trim();
            let (name, lang) = left.rsplit_once(char::is_whitespace)?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(VoiceInfo::new(name, lang.replace('_', "-")))
        })
        .collect()
}
