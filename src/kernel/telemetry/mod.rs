//! Voice loop telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer.
//! It must **NEVER** be read inside decision logic (controller or channels).
//! It exists solely for observability and verification.
//!
//! # PRIVACY INVARIANT
//! Telemetry events must **NEVER** contain user content (transcripts, spoken
//! responses, prompts). Only epochs, modes, durations and counts are allowed.

pub mod event;
pub mod metrics;
pub mod recorder;
