use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// One normalized face-mesh point. Coordinates are in `[0, 1]` image space.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Which debounce counter a reading feeds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum SignalKind {
    Gaze,
    Occlusion,
    Object,
    Focus,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Gaze => "gaze",
            SignalKind::Occlusion => "occlusion",
            SignalKind::Object => "object",
            SignalKind::Focus => "focus",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalValue {
    /// Output of the active gaze policy: an iris/eye-width ratio, or the raw
    /// iris-to-corner distance for the absolute-distance policy.
    GazeRatio { value: f32 },
    /// Mean luma of the downsampled frame, 0–255.
    SceneBrightness { value: f32 },
    /// Best watched object class for the frame.
    ObjectConfidence { class_id: u32, score: f32 },
    FocusLost,
    FocusGained,
    /// Sensor gap: no usable observation for this kind on this frame.
    Missing { kind: SignalKind },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalReading {
    pub at: DateTime<Utc>,
    pub value: SignalValue,
}

impl SignalReading {
    pub fn new(at: DateTime<Utc>, value: SignalValue) -> Self {
        Self { at, value }
    }

    pub fn kind(&self) -> SignalKind {
        match &self.value {
            SignalValue::GazeRatio { .. } => SignalKind::Gaze,
            SignalValue::SceneBrightness { .. } => SignalKind::Occlusion,
            SignalValue::ObjectConfidence { .. } => SignalKind::Object,
            SignalValue::FocusLost | SignalValue::FocusGained => SignalKind::Focus,
            SignalValue::Missing { kind } => *kind,
        }
    }
}

/// Raw input from the signal source adapter, before the engine derives a reading.
#[derive(Debug, Clone)]
pub enum Observation {
    Landmarks(Vec<Landmark>),
    FrameSample(RgbaImage),
    /// Max confidence per class id for one detection pass.
    Detections(BTreeMap<u32, f32>),
    FocusLost,
    FocusGained,
    /// The perception engine for this kind failed on the current frame.
    PerceptionError(SignalKind),
}
