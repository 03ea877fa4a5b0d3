use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Settle time between the end of playback and re-opening the microphone.
pub const SETTLE_DELAY_MS: u64 = 300;

/// Restart delay after a platform-level recognition end or recoverable failure.
pub const RECOVERY_DELAY_MS: u64 = 500;

/// Restart delays used by the controller.
///
/// These are a heuristic standing in for a "channel fully released"
/// acknowledgement the platform does not give us. The driver treats them as a
/// minimum: a restart never fires earlier, but may fire later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartDelays {
    /// Follows a deterministic local event (playback ended).
    pub settle: Duration,
    /// Follows a platform failure, where races are more likely.
    pub recovery: Duration,
}

impl Default for RestartDelays {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(SETTLE_DELAY_MS),
            recovery: Duration::from_millis(RECOVERY_DELAY_MS),
        }
    }
}

/// Monotonic liveness counter. Asynchronous continuations carry the epoch they
/// were issued under; the controller drops anything that no longer matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Epoch(pub u64);

impl Epoch {
    pub fn new() -> Self {
        Epoch(0)
    }

    pub fn next(&self) -> Self {
        Epoch(self.0 + 1)
    }
}
