use serde::{Deserialize, Serialize};

/// A synthesis voice offered by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    pub name: String,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub is_default: bool,
}

impl VoiceInfo {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
            is_default: false,
        }
    }
}

/// Known female voices, most preferred first. Matched as name substrings.
pub const PREFERRED_VOICES: &[&str] = &[
    "Google UK English Female",
    "Microsoft Aria",
    "Microsoft Zira",
    "Samantha",
    "Victoria",
    "Karen",
    "Moira",
    "Tessa",
];

/// Second-tier names used when no preferred voice is installed.
pub const FALLBACK_VOICES: &[&str] = &["Fiona", "Susan", "Hazel", "Serena"];

/// Pick the voice to speak with, or `None` for the platform default.
pub fn select_voice(voices: &[VoiceInfo]) -> Option<VoiceInfo> {
    for preferred in PREFERRED_VOICES {
        if let Some(v) = voices.iter().find(|v| v.name.contains(preferred)) {
            return Some(v.clone());
        }
    }

    voices
        .iter()
        .find(|v| {
            let name = v.name.to_lowercase();
            name.contains("female")
                || FALLBACK_VOICES
                    .iter()
                    .any(|f| name.contains(&f.to_lowercase()))
        })
        .cloned()
}
