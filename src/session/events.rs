use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::models::ViolationKind;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum MonitorEvent {
    ViolationRaised {
        kind: ViolationKind,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    SessionLocked { session_id: String },
}

/// Presentation-layer hook. The core never renders anything itself.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: MonitorEvent);
}

/// Writes events to the log and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: MonitorEvent) {
        match event {
            MonitorEvent::ViolationRaised { kind, timestamp } => {
                log::info!("violation raised: {kind} at {timestamp}");
            }
            MonitorEvent::SessionLocked { session_id } => {
                log::warn!("session {session_id} locked by the authority");
            }
        }
    }
}

/// Forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<MonitorEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MonitorEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: MonitorEvent) {
        // Receiver gone means nobody is displaying; nothing to do.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn events_serialize_with_tag() {
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        let raised = MonitorEvent::ViolationRaised {
            kind: ViolationKind::FocusLost,
            timestamp: at,
        };
        let locked = MonitorEvent::SessionLocked {
            session_id: "s-1".into(),
        };

        assert_eq!(
            serde_json::to_value(&raised).unwrap(),
            json!({ "event": "violationRaised", "kind": "focus-lost", "timestamp": "2026-05-01T08:00:00Z" })
        );
        assert_eq!(
            serde_json::to_value(&locked).unwrap(),
            json!({ "event": "sessionLocked", "sessionId": "s-1" })
        );
    }
}
