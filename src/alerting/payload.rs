use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ParticipantIdentity, ViolationEvent};

use super::evidence::EvidenceImage;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPayload {
    pub participant_id: String,
    pub participant_name: String,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    pub violation_kind: String,
    /// Base64 JPEG; empty when capture failed.
    pub evidence_image: String,
    pub camera_ok: bool,
    pub timestamp: DateTime<Utc>,
}

impl AlertPayload {
    pub fn new(identity: &ParticipantIdentity, event: &ViolationEvent, evidence: &EvidenceImage) -> Self {
        Self {
            participant_id: identity.participant_id.clone(),
            participant_name: identity.participant_name.clone(),
            session_id: identity.session_id.clone(),
            course: identity.course.clone(),
            violation_kind: event.kind.to_string(),
            evidence_image: evidence.to_base64(),
            camera_ok: event.camera_ok,
            timestamp: event.detected_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatPayload {
    pub participant_id: String,
    pub session_id: String,
}

impl From<&ParticipantIdentity> for HeartbeatPayload {
    fn from(identity: &ParticipantIdentity) -> Self {
        Self {
            participant_id: identity.participant_id.clone(),
            session_id: identity.session_id.clone(),
        }
    }
}

/// Authority reply to an alert: `{"status": "OK" | "BLOCKED"}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorityReply {
    #[serde(default)]
    pub status: String,
}

impl AuthorityReply {
    pub fn is_lockout(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("blocked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ViolationKind;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn alert_payload_uses_camel_case_wire_names() {
        let identity = ParticipantIdentity {
            participant_id: "20231234".into(),
            participant_name: "Ana Quispe".into(),
            session_id: "exam-7".into(),
            course: None,
        };
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap();
        let event = ViolationEvent::new(ViolationKind::CameraOccluded, at);
        let payload = AlertPayload::new(&identity, &event, &EvidenceImage::from_jpeg(vec![1, 2, 3]));

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "participantId": "20231234",
                "participantName": "Ana Quispe",
                "sessionId": "exam-7",
                "violationKind": "camera-occluded",
                "evidenceImage": "AQID",
                "cameraOk": false,
                "timestamp": "2026-03-02T09:30:00Z",
            })
        );
    }

    #[test]
    fn reply_status_is_case_insensitive() {
        let blocked: AuthorityReply = serde_json::from_str(r#"{"status":"BLOCKED"}"#).unwrap();
        let lower: AuthorityReply = serde_json::from_str(r#"{"status":"blocked"}"#).unwrap();
        let ok: AuthorityReply =
            serde_json::from_str(r#"{"status":"ok","mensaje":"Alerta procesada"}"#).unwrap();
        let bare: AuthorityReply = serde_json::from_str("{}").unwrap();

        assert!(blocked.is_lockout());
        assert!(lower.is_lockout());
        assert!(!ok.is_lockout());
        assert!(!bare.is_lockout());
    }
}
