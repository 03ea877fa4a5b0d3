pub mod config;
pub mod error;
pub mod kernel;
pub mod runtime;
pub mod services;
pub mod speech;

// Entry points for embedding hosts
pub use kernel::controller::DialogueController;
pub use runtime::{VoiceDriver, VoiceHandle};
