//! Error types for the voice assistant.

use std::time::Duration;

use thiserror::Error;

/// Failures talking to the remote voice backend.
///
/// Distinct from a well-formed reply carrying `action: "error"`, which the
/// controller handles as a normal branch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The request never produced an HTTP response.
    #[error("voice backend unreachable: {0}")]
    Transport(String),

    /// The backend did not answer within the configured timeout.
    #[error("voice backend timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered with a non-success status.
    #[error("voice backend returned {code}: {body}")]
    Status { code: u16, body: String },

    /// The response body was not the expected JSON shape.
    #[error("voice backend sent an unreadable reply: {0}")]
    Decode(String),
}

impl BackendError {
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            BackendError::Timeout(timeout)
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Decode(err.to_string())
    }
}

/// Failures of the speech engines behind the input and output channels.
#[derive(Debug, Error)]
pub enum SpeechError {
    /// The platform has no such capability. Permanent.
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    /// The engine refused or failed to start.
    #[error("speech engine error: {0}")]
    Engine(String),

    #[error("speech engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// The runtime driver is gone; commands can no longer be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("voice driver has shut down")]
pub struct DriverClosed;
