pub mod client;
pub mod types;

pub use client::{HttpVoiceBackend, VoiceBackend};
pub use types::*;
