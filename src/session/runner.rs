use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    sync::{mpsc, watch},
    task::JoinSet,
    time::Instant,
};
use tokio_util::sync::CancellationToken;

use crate::alerting::{AlertDispatcher, DispatchOutcome, EvidenceCapturer, EvidenceImage};
use crate::models::{Observation, SessionState};

use super::events::{EventSink, MonitorEvent};
use super::pipeline::ViolationPipeline;
use super::stats::PipelineStats;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug)]
pub(crate) enum SessionInput {
    Observe {
        observation: Observation,
        at: DateTime<Utc>,
    },
    Terminate,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub state: SessionState,
    pub stats: PipelineStats,
}

pub(crate) struct SessionRunner {
    pub pipeline: ViolationPipeline,
    pub capturer: EvidenceCapturer,
    pub dispatcher: AlertDispatcher,
    pub sink: Arc<dyn EventSink>,
    pub state_tx: watch::Sender<SessionState>,
}

impl SessionRunner {
    /// Own the session until it is locked, terminated, or every handle is dropped.
    ///
    /// Inputs are handled one at a time in arrival order. The single in-flight
    /// alert runs on the join set so signals keep flowing while it is pending.
    pub async fn run(
        mut self,
        mut input_rx: mpsc::Receiver<SessionInput>,
        cancel_token: CancellationToken,
    ) -> SessionSummary {
        let session_id = self.dispatcher.identity().session_id.clone();
        let mut inflight: JoinSet<DispatchOutcome> = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = cancel_token.cancelled() => {
                    log_info!("session {} cancelled", session_id);
                    break;
                }
                Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
                    let outcome = joined.unwrap_or_else(|err| {
                        log_error!("alert task for session {} failed to join: {err}", session_id);
                        DispatchOutcome::NetworkFailure { reason: err.to_string() }
                    });
                    if self.pipeline.finish_dispatch(&outcome, Instant::now()) {
                        self.enter_lockout(&session_id, &cancel_token);
                        break;
                    }
                }
                input = input_rx.recv() => match input {
                    Some(SessionInput::Observe { observation, at }) => {
                        self.handle_observation(&observation, at, &mut inflight);
                    }
                    Some(SessionInput::Terminate) | None => {
                        log_info!("session {} terminated", session_id);
                        break;
                    }
                },
            }
        }

        // Late alert replies are irrelevant once the session is over.
        inflight.abort_all();
        cancel_token.cancel();

        SessionSummary {
            session_id,
            state: self.pipeline.state(),
            stats: self.pipeline.stats().clone(),
        }
    }

    fn handle_observation(
        &mut self,
        observation: &Observation,
        at: DateTime<Utc>,
        inflight: &mut JoinSet<DispatchOutcome>,
    ) {
        let Some(event) = self.pipeline.process(observation, at, Instant::now()) else {
            return;
        };

        // Capture before the network call so the image matches the triggering frame.
        let evidence = match self.capturer.capture() {
            Ok(evidence) => evidence,
            Err(err) => {
                log_warn!("evidence capture failed, sending alert without image: {err:#}");
                self.pipeline.note_evidence_failure();
                EvidenceImage::empty()
            }
        };

        self.sink.emit(MonitorEvent::ViolationRaised {
            kind: event.kind.clone(),
            timestamp: event.detected_at,
        });

        let dispatcher = self.dispatcher.clone();
        inflight.spawn(async move { dispatcher.send(&event, &evidence).await });
    }

    fn enter_lockout(&mut self, session_id: &str, cancel_token: &CancellationToken) {
        cancel_token.cancel();
        self.state_tx.send_replace(SessionState::Locked);
        self.sink.emit(MonitorEvent::SessionLocked {
            session_id: session_id.to_string(),
        });
        log_warn!("session {} locked; monitoring stopped", session_id);
    }
}
