use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::alerting::{AlertGate, DispatchOutcome};
use crate::detection::DebounceEngine;
use crate::models::{Observation, SessionState, ViolationEvent};
use crate::settings::MonitorConfig;

use super::stats::PipelineStats;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Debounce engine, alert gate and session state for one session.
///
/// All state changes happen synchronously inside these methods; the async
/// runner only decides when to call them.
#[derive(Debug)]
pub struct ViolationPipeline {
    engine: DebounceEngine,
    gate: AlertGate,
    state: SessionState,
    stats: PipelineStats,
}

impl ViolationPipeline {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            engine: DebounceEngine::new(config),
            gate: AlertGate::new(config.alert.cooldown()),
            state: SessionState::Active,
            stats: PipelineStats::default(),
        }
    }

    /// Observe one adapter input. Returns the violation only when it is both
    /// confirmed by the engine and admitted by the gate.
    pub fn process(
        &mut self,
        observation: &Observation,
        at: DateTime<Utc>,
        now: Instant,
    ) -> Option<ViolationEvent> {
        if self.state.is_locked() {
            return None;
        }

        self.stats.readings += 1;
        let event = self.engine.observe_raw(observation, at)?;
        self.stats.violations_confirmed += 1;

        if !self.gate.try_admit(&event, now) {
            self.stats.alerts_discarded += 1;
            return None;
        }

        self.stats.alerts_admitted += 1;
        Some(event)
    }

    /// Record a finished dispatch. Returns true exactly once: on the call that
    /// moves the session to `Locked`.
    pub fn finish_dispatch(&mut self, outcome: &DispatchOutcome, now: Instant) -> bool {
        self.gate.complete(now);
        self.stats.record_outcome(outcome);

        match outcome {
            DispatchOutcome::Rejected { status } => {
                log_warn!("authority rejected alert with HTTP {status}");
            }
            DispatchOutcome::NetworkFailure { reason } => {
                log_warn!("alert dispatch failed, not retrying: {reason}");
            }
            DispatchOutcome::Delivered { .. } => {}
        }

        if outcome.is_lockout() && !self.state.is_locked() {
            self.state = SessionState::Locked;
            log_info!("lockout directive received; session is now locked");
            return true;
        }
        false
    }

    pub fn note_evidence_failure(&mut self) {
        self.stats.evidence_failures += 1;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn engine(&self) -> &DebounceEngine {
        &self.engine
    }

    pub fn gate(&self) -> &AlertGate {
        &self.gate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{AlertSettings, DebounceSettings};
    use std::time::Duration;

    fn pipeline(cooldown_ms: u64) -> ViolationPipeline {
        ViolationPipeline::new(&MonitorConfig {
            debounce: DebounceSettings {
                focus_frames: 0,
                ..Default::default()
            },
            alert: AlertSettings { cooldown_ms },
            ..Default::default()
        })
    }

    #[test]
    fn gated_violations_are_dropped_not_queued() {
        let mut pipeline = pipeline(4000);
        let t0 = Instant::now();

        assert!(pipeline.process(&Observation::FocusLost, Utc::now(), t0).is_some());
        assert!(pipeline.gate().is_in_flight());
        assert!(pipeline
            .process(&Observation::FocusLost, Utc::now(), t0 + Duration::from_millis(500))
            .is_none());
        pipeline.finish_dispatch(
            &DispatchOutcome::Delivered { lockout: false },
            t0 + Duration::from_millis(600),
        );
        assert!(!pipeline.gate().is_in_flight());
        assert_eq!(
            pipeline.gate().cooldown_remaining(t0 + Duration::from_millis(1600)),
            Duration::from_millis(3000)
        );
        assert!(pipeline
            .process(&Observation::FocusLost, Utc::now(), t0 + Duration::from_millis(1600))
            .is_none());

        // Nothing was queued: the first admission after cooldown is a fresh event.
        let later = pipeline
            .process(&Observation::FocusLost, Utc::now(), t0 + Duration::from_millis(4600))
            .unwrap();
        assert!(later.camera_ok);

        let stats = pipeline.stats();
        assert_eq!(stats.violations_confirmed, 4);
        assert_eq!(stats.alerts_admitted, 2);
        assert_eq!(stats.alerts_discarded, 2);
    }

    #[test]
    fn network_failure_still_applies_cooldown_then_recovers() {
        let mut pipeline = pipeline(4000);
        let t0 = Instant::now();

        assert!(pipeline.process(&Observation::FocusLost, Utc::now(), t0).is_some());
        let locked = pipeline.finish_dispatch(
            &DispatchOutcome::NetworkFailure {
                reason: "connection refused".into(),
            },
            t0,
        );
        assert!(!locked);
        assert_eq!(pipeline.state(), SessionState::Active);

        assert!(pipeline
            .process(&Observation::FocusLost, Utc::now(), t0 + Duration::from_millis(1000))
            .is_none());
        assert!(pipeline
            .process(&Observation::FocusLost, Utc::now(), t0 + Duration::from_millis(4000))
            .is_some());
        assert_eq!(pipeline.stats().network_failures, 1);
    }

    #[test]
    fn lockout_happens_once_and_silences_the_pipeline() {
        let mut pipeline = pipeline(0);
        let t0 = Instant::now();

        assert!(pipeline.process(&Observation::FocusLost, Utc::now(), t0).is_some());
        assert!(pipeline.finish_dispatch(&DispatchOutcome::Delivered { lockout: true }, t0));
        assert_eq!(pipeline.state(), SessionState::Locked);

        // A late duplicate directive is not a second transition.
        assert!(!pipeline.finish_dispatch(&DispatchOutcome::Delivered { lockout: true }, t0));

        for step in 1..10 {
            let now = t0 + Duration::from_secs(step);
            assert!(pipeline.process(&Observation::FocusLost, Utc::now(), now).is_none());
        }
        assert_eq!(pipeline.stats().alerts_admitted, 1);
    }

    #[test]
    fn rejection_does_not_lock() {
        let mut pipeline = pipeline(0);
        let t0 = Instant::now();
        pipeline.process(&Observation::FocusLost, Utc::now(), t0);
        assert!(!pipeline.finish_dispatch(&DispatchOutcome::Rejected { status: 422 }, t0));
        assert_eq!(pipeline.state(), SessionState::Active);
        assert_eq!(pipeline.stats().rejected, 1);
    }
}
