use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::alerting::{AlertDispatcher, DispatchOutcome};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Periodic liveness ping, independent of violation traffic.
pub struct SessionMonitor {
    dispatcher: AlertDispatcher,
    sent: u64,
    failed: u64,
}

impl SessionMonitor {
    pub fn new(dispatcher: AlertDispatcher) -> Self {
        Self {
            dispatcher,
            sent: 0,
            failed: 0,
        }
    }

    /// Send one heartbeat. Failures are logged and never escalate.
    pub async fn tick(&mut self) -> DispatchOutcome {
        let outcome = self.dispatcher.heartbeat().await;
        match &outcome {
            DispatchOutcome::Delivered { .. } => {
                self.sent += 1;
                log_debug!(
                    "heartbeat #{} delivered for session {}",
                    self.sent,
                    self.dispatcher.identity().session_id
                );
            }
            other => {
                self.failed += 1;
                log_warn!(
                    "heartbeat for session {} failed: {:?}",
                    self.dispatcher.identity().session_id,
                    other
                );
            }
        }
        outcome
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    /// Tick every `period` until `cancel_token` fires. A heartbeat still in
    /// flight at cancellation is abandoned.
    pub async fn run(mut self, period: Duration, cancel_token: CancellationToken) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        biased;
                        _ = cancel_token.cancelled() => break,
                        _ = self.tick() => {}
                    }
                }
            }
        }

        log_info!(
            "heartbeat loop shutting down ({} sent, {} failed)",
            self.sent,
            self.failed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ParticipantIdentity;
    use crate::settings::ServerSettings;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn monitor(base_url: String) -> SessionMonitor {
        let server = ServerSettings {
            base_url,
            request_timeout_ms: 2_000,
            ..Default::default()
        };
        let identity = ParticipantIdentity {
            participant_id: "20231234".into(),
            participant_name: "Ana Quispe".into(),
            session_id: "exam-7".into(),
            course: None,
        };
        SessionMonitor::new(AlertDispatcher::new(&server, identity).unwrap())
    }

    #[tokio::test]
    async fn tick_counts_delivered_and_failed_heartbeats() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/heartbeat"))
            .respond_with(ResponseTemplate::new(200))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/heartbeat"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let mut monitor = monitor(server.uri());
        monitor.tick().await;
        monitor.tick().await;
        let outcome = monitor.tick().await;

        assert_eq!(outcome, DispatchOutcome::Rejected { status: 503 });
        assert_eq!(monitor.sent(), 2);
        assert_eq!(monitor.failed(), 1);
    }
}
