use tracing::info;

use crate::kernel::mode::InteractionMode;

/// Notifications toward the embedding application.
pub trait VoiceHooks: Send + Sync {
    fn on_mode_change(&self, _from: InteractionMode, _to: InteractionMode) {}

    /// A prompt is ready for the main (non-voice) analysis pipeline.
    fn on_ready_for_planning(&self, prompt: &str);

    fn on_error(&self, _message: &str) {}
}

/// Hooks that only log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHooks;

impl VoiceHooks for LoggingHooks {
    fn on_mode_change(&self, from: InteractionMode, to: InteractionMode) {
        info!("Voice mode {} -> {}", from, to);
    }

    fn on_ready_for_planning(&self, prompt: &str) {
        info!("Ready for planning ({} chars)", prompt.len());
    }

    fn on_error(&self, message: &str) {
        info!("Voice error: {}", message);
    }
}
