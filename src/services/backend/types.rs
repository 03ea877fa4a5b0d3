use serde::{Deserialize, Serialize};

/// What the backend wants the voice loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendAction {
    Listen,
    Speak,
    StopSpeaking,
    AskClarification,
    ConfirmPrompt,
    ForwardToPlanning,
    Acknowledge,
    Reset,
    Error,
    /// Any tag this client does not know. Handled like `Listen`.
    #[serde(other)]
    Unknown,
}

impl Default for BackendAction {
    fn default() -> Self {
        Self::Listen
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessRequest<'a> {
    pub session_id: &'a str,
    pub text: &'a str,
    pub is_final: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfirmRequest<'a> {
    pub session_id: Option<&'a str>,
    pub confirmed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetRequest<'a> {
    pub session_id: &'a str,
}

/// Reply to a processed transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessReply {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub action: BackendAction,
    #[serde(default)]
    pub voice_response: Option<String>,
    #[serde(default)]
    pub refined_prompt: Option<String>,
}

/// Reply to an explicit confirmation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfirmReply {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub ready_for_planning: Option<bool>,
    #[serde(default)]
    pub voice_response: Option<String>,
    #[serde(default)]
    pub refined_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusReply {
    #[serde(default)]
    pub status: String,
}

/// Treats blank strings the same as a missing field.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ProcessReply {
    pub fn spoken_text(&self) -> Option<&str> {
        non_blank(&self.voice_response)
    }

    pub fn refined(&self) -> Option<&str> {
        non_blank(&self.refined_prompt)
    }
}

impl ConfirmReply {
    pub fn is_ready(&self) -> bool {
        self.ready_for_planning.unwrap_or(false)
    }

    pub fn spoken_text(&self) -> Option<&str> {
        non_blank(&self.voice_response)
    }

    pub fn refined(&self) -> Option<&str> {
        non_blank(&self.refined_prompt)
    }
}
