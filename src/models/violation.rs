use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    GazeDeviation,
    ObjectDetected { label: String },
    CameraOccluded,
    FocusLost,
}

impl ViolationKind {
    /// Only occlusion means the camera itself is unusable.
    pub fn camera_ok(&self) -> bool {
        !matches!(self, ViolationKind::CameraOccluded)
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::GazeDeviation => f.write_str("gaze-deviation"),
            ViolationKind::ObjectDetected { label } => write!(f, "object-detected:{label}"),
            ViolationKind::CameraOccluded => f.write_str("camera-occluded"),
            ViolationKind::FocusLost => f.write_str("focus-lost"),
        }
    }
}

impl Serialize for ViolationKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationEvent {
    pub kind: ViolationKind,
    pub camera_ok: bool,
    pub detected_at: DateTime<Utc>,
    /// Detector confidence for object events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl ViolationEvent {
    pub fn new(kind: ViolationKind, detected_at: DateTime<Utc>) -> Self {
        Self {
            camera_ok: kind.camera_ok(),
            kind,
            detected_at,
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}
