use std::time::Duration;

use tokio::time::Instant;

use crate::models::ViolationEvent;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Single-flight alert gate with a trailing cooldown.
///
/// Events refused by the gate are dropped, never queued.
#[derive(Debug, Clone)]
pub struct AlertGate {
    in_flight: bool,
    cooldown_until: Option<Instant>,
    cooldown: Duration,
    admitted: u64,
    discarded: u64,
}

impl AlertGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            in_flight: false,
            cooldown_until: None,
            cooldown,
            admitted: 0,
            discarded: 0,
        }
    }

    /// Admit `event` iff nothing is in flight and the cooldown has elapsed.
    pub fn try_admit(&mut self, event: &ViolationEvent, now: Instant) -> bool {
        let cooling = self.cooldown_until.is_some_and(|until| now < until);
        if self.in_flight || cooling {
            self.discarded += 1;
            log_debug!(
                "gate discarded {} (in_flight={}, cooldown_remaining={:?})",
                event.kind,
                self.in_flight,
                self.cooldown_remaining(now)
            );
            return false;
        }

        self.in_flight = true;
        self.admitted += 1;
        true
    }

    /// Close out the in-flight dispatch, successful or not, and start the cooldown.
    pub fn complete(&mut self, now: Instant) {
        self.in_flight = false;
        self.cooldown_until = Some(now + self.cooldown);
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn cooldown_remaining(&self, now: Instant) -> Duration {
        self.cooldown_until
            .map(|until| until.saturating_duration_since(now))
            .unwrap_or_default()
    }

    pub fn admitted(&self) -> u64 {
        self.admitted
    }

    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ViolationKind;
    use chrono::Utc;

    fn event() -> ViolationEvent {
        ViolationEvent::new(ViolationKind::GazeDeviation, Utc::now())
    }

    #[test]
    fn blocks_while_in_flight() {
        let mut gate = AlertGate::new(Duration::from_millis(4000));
        let t0 = Instant::now();
        assert!(gate.try_admit(&event(), t0));
        assert!(gate.is_in_flight());
        assert!(!gate.try_admit(&event(), t0 + Duration::from_secs(60)));
        assert_eq!(gate.discarded(), 1);
    }

    #[test]
    fn cooldown_spaces_admissions() {
        let mut gate = AlertGate::new(Duration::from_millis(4000));
        let t0 = Instant::now();
        assert!(gate.try_admit(&event(), t0));
        gate.complete(t0);

        assert!(!gate.try_admit(&event(), t0 + Duration::from_millis(1000)));
        assert!(!gate.try_admit(&event(), t0 + Duration::from_millis(3999)));
        assert!(gate.try_admit(&event(), t0 + Duration::from_millis(4000)));
        assert_eq!(gate.admitted(), 2);
        assert_eq!(gate.discarded(), 2);
    }

    #[test]
    fn cooldown_runs_from_completion_not_admission() {
        let mut gate = AlertGate::new(Duration::from_millis(4000));
        let t0 = Instant::now();
        assert!(gate.try_admit(&event(), t0));
        gate.complete(t0 + Duration::from_millis(2500));

        assert!(!gate.try_admit(&event(), t0 + Duration::from_millis(4500)));
        assert_eq!(
            gate.cooldown_remaining(t0 + Duration::from_millis(4500)),
            Duration::from_millis(2000)
        );
        assert!(gate.try_admit(&event(), t0 + Duration::from_millis(6500)));
    }
}
