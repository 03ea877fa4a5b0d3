use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::types::{
    ConfirmReply, ConfirmRequest, ProcessReply, ProcessRequest, ResetRequest, StatusReply,
};
use crate::config::VoiceConfig;
use crate::error::BackendError;

pub const PROCESS_PATH: &str = "/api/voice/process";
pub const CONFIRM_PATH: &str = "/api/voice/confirm";
pub const RESET_PATH: &str = "/api/voice/reset";

/// The remote text-processing capability the dialogue talks to.
#[async_trait]
pub trait VoiceBackend: Send + Sync {
    async fn process_text(
        &self,
        session_id: &str,
        text: &str,
        is_final: bool,
    ) -> Result<ProcessReply, BackendError>;

    async fn confirm(
        &self,
        session_id: Option<&str>,
        confirmed: bool,
    ) -> Result<ConfirmReply, BackendError>;

    async fn reset_voice_state(&self, session_id: &str) -> Result<StatusReply, BackendError>;
}

/// JSON-over-HTTP binding of [`VoiceBackend`].
#[derive(Clone)]
pub struct HttpVoiceBackend {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
    timeout: Duration,
}

impl HttpVoiceBackend {
    pub fn new(config: &VoiceConfig) -> Result<Self, BackendError> {
        let timeout = config.request_timeout();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            timeout,
        })
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request_id = Uuid::new_v4();
        debug!("POST {} (request {})", path, request_id);

        let mut req = self
            .client
            .post(self.endpoint(path))
            .header("X-Request-Id", request_id.to_string())
            .json(body);
        if let Some(token) = &self.auth_token {
            req = req.bearer_auth(token);
        }

        let response = req
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BackendError::from_reqwest(e, self.timeout))?;

        if !status.is_success() {
            return Err(BackendError::Status {
                code: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).chars().take(512).collect(),
            });
        }

        debug!("POST {} -> {} (request {})", path, status, request_id);
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl VoiceBackend for HttpVoiceBackend {
    async fn process_text(
        &self,
        session_id: &str,
        text: &str,
        is_final: bool,
    ) -> Result<ProcessReply, BackendError> {
        let body = ProcessRequest { session_id, text, is_final };
        self.post(PROCESS_PATH, &body).await
    }

    async fn confirm(
        &self,
        session_id: Option<&str>,
        confirmed: bool,
    ) -> Result<ConfirmReply, BackendError> {
        let body = ConfirmRequest { session_id, confirmed };
        self.post(CONFIRM_PATH, &body).await
    }

    async fn reset_voice_state(&self, session_id: &str) -> Result<StatusReply, BackendError> {
        let body = ResetRequest { session_id };
        self.post(RESET_PATH, &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let cfg = VoiceConfig {
            backend_url: "http://localhost:8000/".to_string(),
            ..VoiceConfig::default()
        };
        let backend = HttpVoiceBackend::new(&cfg).unwrap();
        assert_eq!(backend.endpoint(PROCESS_PATH), "http://localhost:8000/api/voice/process");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_typed_failure() {
        let cfg = VoiceConfig {
            // Port 9 (discard) on loopback is not listening in test environments.
            backend_url: "http://127.0.0.1:9".to_string(),
            request_timeout_ms: 2_000,
            ..VoiceConfig::default()
        };
        let backend = HttpVoiceBackend::new(&cfg).unwrap();
        let err = backend.process_text("s1", "hello", true).await.unwrap_err();
        assert!(matches!(err, BackendError::Transport(_) | BackendError::Timeout(_)));
    }
}
