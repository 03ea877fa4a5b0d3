//! Runtime configuration.
//!
//! Layering: built-in defaults, then an optional JSON file named by
//! `PHARMAVOICE_CONFIG`, then individual `PHARMAVOICE_*` environment overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::kernel::time::{RestartDelays, RECOVERY_DELAY_MS, SETTLE_DELAY_MS};
use crate::speech::output::SpeechSettings;

pub const CONFIG_PATH_ENV: &str = "PHARMAVOICE_CONFIG";

#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceConfig {
    /// Base URL of the analysis backend, without a trailing slash.
    pub backend_url: String,
    /// Bearer token sent with every backend call.
    pub auth_token: Option<String>,
    pub request_timeout_ms: u64,

    pub settle_delay_ms: u64,
    pub recovery_delay_ms: u64,

    pub speech_rate: f32,
    pub speech_pitch: f32,
    pub speech_volume: f32,
    pub language: String,

    /// External text-to-speech command for the console synthesizer.
    pub tts_command: String,
    /// How long the console recognizer waits for a line before reporting no-speech.
    pub silence_timeout_ms: u64,
}

impl std::fmt::Debug for VoiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceConfig")
            .field("backend_url", &self.backend_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("settle_delay_ms", &self.settle_delay_ms)
            .field("recovery_delay_ms", &self.recovery_delay_ms)
            .field("speech_rate", &self.speech_rate)
            .field("speech_pitch", &self.speech_pitch)
            .field("speech_volume", &self.speech_volume)
            .field("language", &self.language)
            .field("tts_command", &self.tts_command)
            .field("silence_timeout_ms", &self.silence_timeout_ms)
            .finish()
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            auth_token: None,
            request_timeout_ms: 30_000,
            settle_delay_ms: SETTLE_DELAY_MS,
            recovery_delay_ms: RECOVERY_DELAY_MS,
            speech_rate: 1.0,
            speech_pitch: 1.0,
            speech_volume: 1.0,
            language: "en-US".to_string(),
            tts_command: "say".to_string(),
            silence_timeout_ms: 10_000,
        }
    }
}

impl VoiceConfig {
    /// Defaults, overlaid with the config file (if any) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply `PHARMAVOICE_*` overrides from `lookup`. Split out from `load` so
    /// it can be driven without touching the process environment.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PHARMAVOICE_BACKEND_URL") {
            self.backend_url = v;
        }
        if let Some(v) = lookup("PHARMAVOICE_TOKEN") {
            self.auth_token = if v.is_empty() { None } else { Some(v) };
        }
        if let Some(v) = lookup("PHARMAVOICE_TIMEOUT_MS") {
            self.request_timeout_ms = parse_u64("PHARMAVOICE_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("PHARMAVOICE_SETTLE_DELAY_MS") {
            self.settle_delay_ms = parse_u64("PHARMAVOICE_SETTLE_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("PHARMAVOICE_RECOVERY_DELAY_MS") {
            self.recovery_delay_ms = parse_u64("PHARMAVOICE_RECOVERY_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("PHARMAVOICE_LANGUAGE") {
            self.language = v;
        }
        if let Some(v) = lookup("PHARMAVOICE_TTS_COMMAND") {
            self.tts_command = v;
        }
        if let Some(v) = lookup("PHARMAVOICE_SILENCE_TIMEOUT_MS") {
            self.silence_timeout_ms = parse_u64("PHARMAVOICE_SILENCE_TIMEOUT_MS", &v)?;
        }
        self.backend_url = self.backend_url.trim_end_matches('/').to_string();
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn restart_delays(&self) -> RestartDelays {
        RestartDelays {
            settle: Duration::from_millis(self.settle_delay_ms),
            recovery: Duration::from_millis(self.recovery_delay_ms),
        }
    }

    pub fn speech_settings(&self) -> SpeechSettings {
        SpeechSettings {
            rate: self.speech_rate,
            pitch: self.speech_pitch,
            volume: self.speech_volume,
            lang: self.language.clone(),
        }
    }
}

fn parse_u64(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn overrides_apply_and_trim_url() {
        let env: HashMap<&str, &str> = [
            ("PHARMAVOICE_BACKEND_URL", "https://api.example.org/"),
            ("PHARMAVOICE_SETTLE_DELAY_MS", "450"),
            ("PHARMAVOICE_TOKEN", ""),
        ]
        .into_iter()
        .collect();

        let mut cfg = VoiceConfig::default();
        cfg.auth_token = Some("old".into());
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(cfg.backend_url, "https://api.example.org");
        assert_eq!(cfg.restart_delays().settle, Duration::from_millis(450));
        assert_eq!(cfg.restart_delays().recovery, Duration::from_millis(RECOVERY_DELAY_MS));
        assert!(cfg.auth_token.is_none());
    }

    #[test]
    fn bad_number_is_rejected() {
        let mut cfg = VoiceConfig::default();
        let err = cfg
            .apply_overrides(|k| (k == "PHARMAVOICE_TIMEOUT_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "PHARMAVOICE_TIMEOUT_MS", .. }));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: VoiceConfig = serde_json::from_str(r#"{"backend_url":"http://b:9"}"#).unwrap();
        assert_eq!(cfg.backend_url, "http://b:9");
        assert_eq!(cfg.settle_delay_ms, SETTLE_DELAY_MS);
        assert_eq!(cfg.tts_command, "say");
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = VoiceConfig {
            auth_token: Some("secret-token".into()),
            ..VoiceConfig::default()
        };
        assert!(!format!("{:?}", cfg).contains("secret-token"));
    }
}
