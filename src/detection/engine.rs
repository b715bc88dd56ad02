use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use image::RgbaImage;

use crate::models::{
    Landmark, Observation, SignalKind, SignalReading, SignalValue, ViolationEvent, ViolationKind,
};
use crate::settings::{MonitorConfig, OcclusionSettings, WatchedClass};

use super::counter::DebounceCounter;
use super::gaze::{predicate_for, GazePredicate};
use super::objects::select_object;
use super::occlusion::{is_dark, mean_luma};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Per-kind persistence counters plus the predicates that feed them.
#[derive(Debug)]
pub struct DebounceEngine {
    counters: BTreeMap<SignalKind, DebounceCounter>,
    gaze: Box<dyn GazePredicate>,
    occlusion: OcclusionSettings,
    watched: Vec<WatchedClass>,
    /// Latest frame sample was dark; gaze and object readings are skipped meanwhile.
    occluded: bool,
}

impl DebounceEngine {
    pub fn new(config: &MonitorConfig) -> Self {
        let latch = config.debounce.latch_until_clear;
        let counters = BTreeMap::from([
            (
                SignalKind::Gaze,
                DebounceCounter::new(config.debounce.gaze_frames, latch),
            ),
            (
                SignalKind::Occlusion,
                DebounceCounter::new(config.debounce.occlusion_frames, latch),
            ),
            (
                SignalKind::Object,
                DebounceCounter::new(config.debounce.object_frames, latch),
            ),
            (
                SignalKind::Focus,
                DebounceCounter::new(config.debounce.focus_frames, latch),
            ),
        ]);

        let mut watched = config.objects.watched.clone();
        watched.sort_by_key(|w| w.class_id);

        Self {
            counters,
            gaze: predicate_for(config.gaze),
            occlusion: config.occlusion.clone(),
            watched,
            occluded: false,
        }
    }

    /// Run one reading through its counter. Returns an event only on the
    /// threshold crossing.
    pub fn observe(&mut self, reading: &SignalReading) -> Option<ViolationEvent> {
        let kind = reading.kind();

        // `Some` means the reading is positive for its kind.
        let verdict: Option<(ViolationKind, Option<f32>)> = match &reading.value {
            SignalValue::GazeRatio { value } => self
                .gaze
                .is_deviated(*value)
                .then_some((ViolationKind::GazeDeviation, None)),
            SignalValue::SceneBrightness { value } => {
                self.occluded = is_dark(*value, &self.occlusion);
                self.occluded
                    .then_some((ViolationKind::CameraOccluded, None))
            }
            SignalValue::ObjectConfidence { class_id, score } => self
                .watched
                .iter()
                .find(|w| w.class_id == *class_id)
                .filter(|w| *score > w.min_confidence)
                .map(|w| {
                    (
                        ViolationKind::ObjectDetected {
                            label: w.label.clone(),
                        },
                        Some(*score),
                    )
                }),
            SignalValue::FocusLost => Some((ViolationKind::FocusLost, None)),
            SignalValue::FocusGained => None,
            SignalValue::Missing { kind } => {
                if *kind == SignalKind::Occlusion {
                    self.occluded = false;
                }
                None
            }
        };

        let counter = self.counters.get_mut(&kind)?;
        if !counter.update(verdict.is_some()) {
            return None;
        }

        let (violation, confidence) = verdict?;
        log_info!(
            "{} persisted for {} frame(s): {}",
            kind.as_str(),
            counter.threshold().max(1),
            violation
        );
        let event = ViolationEvent::new(violation, reading.at);
        Some(match confidence {
            Some(score) => event.with_confidence(score),
            None => event,
        })
    }

    /// Derive a reading from a raw adapter observation and observe it.
    pub fn observe_raw(&mut self, observation: &Observation, at: DateTime<Utc>) -> Option<ViolationEvent> {
        let reading = self.derive_reading(observation, at);
        self.observe(&reading)
    }

    pub fn derive_reading(&self, observation: &Observation, at: DateTime<Utc>) -> SignalReading {
        let value = match observation {
            Observation::Landmarks(points) => self.gaze_value(points),
            Observation::FrameSample(frame) => self.brightness_value(frame),
            Observation::Detections(scores) => self.object_value(scores),
            Observation::FocusLost => SignalValue::FocusLost,
            Observation::FocusGained => SignalValue::FocusGained,
            Observation::PerceptionError(kind) => {
                log_debug!("perception error for {}, counting as a gap", kind.as_str());
                SignalValue::Missing { kind: *kind }
            }
        };
        SignalReading::new(at, value)
    }

    pub fn is_occluded(&self) -> bool {
        self.occluded
    }

    pub fn count(&self, kind: SignalKind) -> u32 {
        self.counters.get(&kind).map_or(0, DebounceCounter::count)
    }

    pub fn gaze_policy(&self) -> &'static str {
        self.gaze.name()
    }

    fn gaze_value(&self, points: &[Landmark]) -> SignalValue {
        if self.occluded {
            return SignalValue::Missing {
                kind: SignalKind::Gaze,
            };
        }
        match self.gaze.measure(points) {
            Some(value) => SignalValue::GazeRatio { value },
            None => SignalValue::Missing {
                kind: SignalKind::Gaze,
            },
        }
    }

    fn brightness_value(&self, frame: &RgbaImage) -> SignalValue {
        match mean_luma(frame, &self.occlusion) {
            Some(value) => SignalValue::SceneBrightness { value },
            None => SignalValue::Missing {
                kind: SignalKind::Occlusion,
            },
        }
    }

    fn object_value(&self, scores: &BTreeMap<u32, f32>) -> SignalValue {
        if self.occluded {
            return SignalValue::Missing {
                kind: SignalKind::Object,
            };
        }
        match select_object(scores, &self.watched) {
            Some((class_id, score)) => SignalValue::ObjectConfidence { class_id, score },
            None => SignalValue::Missing {
                kind: SignalKind::Object,
            },
        }
    }
}
