use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Active,
    /// Terminal: set only by a server lockout directive.
    Locked,
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Active
    }
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Active => "Active",
            SessionState::Locked => "Locked",
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, SessionState::Locked)
    }
}

/// Who is being monitored, echoed on every alert and heartbeat.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParticipantIdentity {
    pub participant_id: String,
    pub participant_name: String,
    pub session_id: String,
    pub course: Option<String>,
}

impl ParticipantIdentity {
    /// Fill in a fresh session id when none was configured.
    pub fn with_session_id_or_generate(mut self) -> Self {
        if self.session_id.trim().is_empty() {
            self.session_id = Uuid::new_v4().to_string();
        }
        self
    }
}
