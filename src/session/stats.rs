use serde::{Deserialize, Serialize};

use crate::alerting::DispatchOutcome;

/// Running counters for one session's violation pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    pub readings: u64,
    pub violations_confirmed: u64,
    pub alerts_admitted: u64,
    pub alerts_discarded: u64,
    pub delivered: u64,
    pub rejected: u64,
    pub network_failures: u64,
    pub evidence_failures: u64,
}

impl PipelineStats {
    pub fn record_outcome(&mut self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Delivered { .. } => self.delivered += 1,
            DispatchOutcome::Rejected { .. } => self.rejected += 1,
            DispatchOutcome::NetworkFailure { .. } => self.network_failures += 1,
        }
    }
}
