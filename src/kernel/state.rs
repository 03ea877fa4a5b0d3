use serde::{Deserialize, Serialize};

use super::mode::InteractionMode;

/// Mutable state of the dialogue. Only the controller writes it.
#[derive(Debug, Clone, Default)]
pub struct DialogueState {
    pub active: bool,
    pub mode: InteractionMode,

    // Channel / dispatch flags
    pub listening: bool,
    pub speaking: bool,
    pub processing: bool,
    pub awaiting_confirmation: bool,

    /// Speech recognition available on this platform. Detected once.
    pub supported: bool,

    /// Backend analysis session. Absent for a brand-new chat.
    pub session_id: Option<String>,

    // Transient text
    pub transcript: String,
    pub interim_transcript: String,
    pub last_response: String,
    pub refined_prompt: Option<String>,
    pub error: Option<String>,
}

impl DialogueState {
    pub fn new(supported: bool) -> Self {
        Self {
            supported,
            ..Self::default()
        }
    }

    /// Clears everything that belongs to a single utterance cycle.
    pub fn clear_transient(&mut self) {
        self.transcript.clear();
        self.interim_transcript.clear();
        self.last_response.clear();
        self.refined_prompt = None;
        self.error = None;
        self.awaiting_confirmation = false;
    }

    pub fn status(&self) -> VoiceStatus {
        VoiceStatus {
            is_active: self.active,
            is_listening: self.listening,
            is_speaking: self.speaking,
            is_processing: self.processing,
            mode: self.mode,
            transcript: self.transcript.clone(),
            interim_transcript: self.interim_transcript.clone(),
            last_response: self.last_response.clone(),
            refined_prompt: self.refined_prompt.clone(),
            error: self.error.clone(),
            is_supported: self.supported,
            awaiting_confirmation: self.awaiting_confirmation,
        }
    }
}

/// Read-only view handed to the embedding UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceStatus {
    pub is_active: bool,
    pub is_listening: bool,
    pub is_speaking: bool,
    pub is_processing: bool,
    pub mode: InteractionMode,
    pub transcript: String,
    pub interim_transcript: String,
    pub last_response: String,
    pub refined_prompt: Option<String>,
    pub error: Option<String>,
    pub is_supported: bool,
    pub awaiting_confirmation: bool,
}
