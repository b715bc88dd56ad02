use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::{ParticipantIdentity, ViolationEvent};
use crate::settings::ServerSettings;

use super::evidence::EvidenceImage;
use super::payload::{AlertPayload, AuthorityReply, HeartbeatPayload};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 2xx from the authority; `lockout` is set when it answered `BLOCKED`.
    Delivered { lockout: bool },
    Rejected { status: u16 },
    NetworkFailure { reason: String },
}

impl DispatchOutcome {
    pub fn is_lockout(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered { lockout: true })
    }

    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Delivered { lockout: true } => "delivered (lockout)",
            DispatchOutcome::Delivered { lockout: false } => "delivered",
            DispatchOutcome::Rejected { .. } => "rejected",
            DispatchOutcome::NetworkFailure { .. } => "network failure",
        }
    }
}

/// Posts alerts and heartbeats to the remote authority. One request per call,
/// never retried.
#[derive(Clone)]
pub struct AlertDispatcher {
    client: reqwest::Client,
    alert_url: String,
    heartbeat_url: String,
    identity: ParticipantIdentity,
}

impl AlertDispatcher {
    pub fn new(server: &ServerSettings, identity: ParticipantIdentity) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(server.request_timeout())
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            alert_url: server.alert_url(),
            heartbeat_url: server.heartbeat_url(),
            identity,
        })
    }

    pub fn identity(&self) -> &ParticipantIdentity {
        &self.identity
    }

    pub async fn send(&self, event: &ViolationEvent, evidence: &EvidenceImage) -> DispatchOutcome {
        let payload = AlertPayload::new(&self.identity, event, evidence);

        let response = match self.post(&self.alert_url, &payload).await {
            Ok(response) => response,
            Err(outcome) => {
                log_warn!(
                    "alert {} for session {} not sent: {:?}",
                    payload.violation_kind,
                    self.identity.session_id,
                    outcome
                );
                return outcome;
            }
        };

        let reply = match response.json::<AuthorityReply>().await {
            Ok(reply) => reply,
            Err(err) => {
                log_warn!("unreadable alert reply, assuming no lockout: {err}");
                AuthorityReply::default()
            }
        };

        let outcome = DispatchOutcome::Delivered {
            lockout: reply.is_lockout(),
        };
        log_info!(
            "alert {} for session {} {} (evidence {} bytes)",
            payload.violation_kind,
            self.identity.session_id,
            outcome.label(),
            evidence.len()
        );
        outcome
    }

    /// Liveness ping. The reply body is ignored; only success or failure matters.
    pub async fn heartbeat(&self) -> DispatchOutcome {
        let payload = HeartbeatPayload::from(&self.identity);
        match self.post(&self.heartbeat_url, &payload).await {
            Ok(_) => DispatchOutcome::Delivered { lockout: false },
            Err(outcome) => outcome,
        }
    }

    async fn post<T: Serialize>(
        &self,
        url: &str,
        body: &T,
    ) -> std::result::Result<reqwest::Response, DispatchOutcome> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| DispatchOutcome::NetworkFailure {
                reason: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchOutcome::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}
