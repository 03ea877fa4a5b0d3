//! Async runtime: executes controller side effects against the speech
//! channels and the voice backend.

pub mod driver;
pub mod handle;
pub mod hooks;

pub use driver::{DriverParts, VoiceDriver};
pub use handle::VoiceHandle;
pub use hooks::{LoggingHooks, VoiceHooks};
