use std::collections::VecDeque;
use super::event::{
    DispatchKind, FailureKind, InterruptionKind, LifecycleEvent, StaleSource, TelemetryEvent,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub session_stats: SessionStats,
    pub dispatch_stats: DispatchStats,
    pub interruption_stats: InterruptionStats,
    pub recovery_stats: RecoveryStats,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    pub activations: u64,
    pub deactivations: u64,
    pub resets: u64,
    pub refused_activations: u64,
    pub mode_transitions: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchStats {
    pub process_calls: u64,
    pub confirm_calls: u64,
    pub dropped: u64,
    pub stale_replies: u64,
    pub planning_handoffs: u64,
    pub bootstrap_handoffs: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterruptionStats {
    pub barge_ins: u64,
    pub swallowed_stop_words: u64,
    pub explicit_stops: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecoveryStats {
    pub restarts_scheduled: u64,
    pub stale_timers: u64,
    pub avg_restart_delay_ms: f64,
    pub recoverable_recognition_failures: u64,
    pub fatal_recognition_failures: u64,
    pub synthesis_failures: u64,
    pub backend_failures: u64,
    pub backend_error_actions: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();
    let mut total_delay_ms = 0u64;

    for event in events {
        match event {
            TelemetryEvent::ModeTransition { .. } => snap.session_stats.mode_transitions += 1,
            TelemetryEvent::Lifecycle(kind) => match kind {
                LifecycleEvent::Activated => snap.session_stats.activations += 1,
                LifecycleEvent::Deactivated => snap.session_stats.deactivations += 1,
                LifecycleEvent::Reset => snap.session_stats.resets += 1,
                LifecycleEvent::ActivationRefused => snap.session_stats.refused_activations += 1,
            },
            TelemetryEvent::Dispatch { kind, .. } => match kind {
                DispatchKind::ProcessText => snap.dispatch_stats.process_calls += 1,
                DispatchKind::Confirm => snap.dispatch_stats.confirm_calls += 1,
            },
            TelemetryEvent::DispatchDropped => snap.dispatch_stats.dropped += 1,
            TelemetryEvent::StaleDiscarded { source, .. } => match source {
                StaleSource::ProcessReply | StaleSource::ConfirmReply => {
                    snap.dispatch_stats.stale_replies += 1
                }
                StaleSource::RestartTimer => snap.recovery_stats.stale_timers += 1,
            },
            TelemetryEvent::Interruption(kind) => match kind {
                InterruptionKind::BargeIn => snap.interruption_stats.barge_ins += 1,
                InterruptionKind::StopWordSwallowed => {
                    snap.interruption_stats.swallowed_stop_words += 1
                }
                InterruptionKind::ExplicitStop => snap.interruption_stats.explicit_stops += 1,
            },
            TelemetryEvent::RestartScheduled { delay_ms } => {
                snap.recovery_stats.restarts_scheduled += 1;
                total_delay_ms += delay_ms;
            }
            TelemetryEvent::Failure(kind) => match kind {
                FailureKind::RecognitionRecoverable => {
                    snap.recovery_stats.recoverable_recognition_failures += 1
                }
                FailureKind::RecognitionFatal => snap.recovery_stats.fatal_recognition_failures += 1,
                FailureKind::Synthesis => snap.recovery_stats.synthesis_failures += 1,
                FailureKind::Backend => snap.recovery_stats.backend_failures += 1,
                FailureKind::BackendErrorAction => snap.recovery_stats.backend_error_actions += 1,
            },
            TelemetryEvent::PlanningHandoff { bootstrap } => {
                snap.dispatch_stats.planning_handoffs += 1;
                if *bootstrap {
                    snap.dispatch_stats.bootstrap_handoffs += 1;
                }
            }
        }
    }

    if snap.recovery_stats.restarts_scheduled > 0 {
        snap.recovery_stats.avg_restart_delay_ms =
            total_delay_ms as f64 / snap.recovery_stats.restarts_scheduled as f64;
    }

    snap
}
