//! Gaze deviation strategies over face-mesh landmarks.
//!
//! Both strategies read the refined face mesh (478 points). The ratio strategy
//! averages both eyes when the right-eye points are present.

use std::fmt;

use crate::models::Landmark;
use crate::settings::GazePolicy;

pub const LEFT_IRIS: usize = 468;
pub const LEFT_EYE_OUTER: usize = 33;
pub const LEFT_EYE_INNER: usize = 133;
pub const RIGHT_IRIS: usize = 473;
pub const RIGHT_EYE_OUTER: usize = 263;
pub const RIGHT_EYE_INNER: usize = 362;

const MIN_EYE_WIDTH: f32 = 1e-4;

pub trait GazePredicate: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Derive the gaze metric, or `None` when the needed points are missing.
    fn measure(&self, landmarks: &[Landmark]) -> Option<f32>;

    fn is_deviated(&self, value: f32) -> bool;
}

pub fn predicate_for(policy: GazePolicy) -> Box<dyn GazePredicate> {
    match policy {
        GazePolicy::Ratio { half_band } => Box::new(RatioBand::new(half_band)),
        GazePolicy::AbsoluteDistance { epsilon } => Box::new(AbsoluteDistance::new(epsilon)),
    }
}

/// Iris offset over eye width; centered gaze sits near 0.5.
#[derive(Debug, Clone, Copy)]
pub struct RatioBand {
    half_band: f32,
}

impl RatioBand {
    pub fn new(half_band: f32) -> Self {
        Self {
            half_band: half_band.abs(),
        }
    }
}

impl GazePredicate for RatioBand {
    fn name(&self) -> &'static str {
        "ratio"
    }

    fn measure(&self, landmarks: &[Landmark]) -> Option<f32> {
        let left = eye_ratio(landmarks, LEFT_IRIS, LEFT_EYE_OUTER, LEFT_EYE_INNER)?;
        match eye_ratio(landmarks, RIGHT_IRIS, RIGHT_EYE_OUTER, RIGHT_EYE_INNER) {
            // Mirror the right eye so both ratios grow in the same direction.
            Some(right) => Some((left + (1.0 - right)) / 2.0),
            None => Some(left),
        }
    }

    fn is_deviated(&self, value: f32) -> bool {
        (value - 0.5).abs() > self.half_band
    }
}

/// Raw horizontal iris-to-outer-corner distance; small means looking sideways.
#[derive(Debug, Clone, Copy)]
pub struct AbsoluteDistance {
    epsilon: f32,
}

impl AbsoluteDistance {
    pub fn new(epsilon: f32) -> Self {
        Self { epsilon }
    }
}

impl GazePredicate for AbsoluteDistance {
    fn name(&self) -> &'static str {
        "absolute_distance"
    }

    fn measure(&self, landmarks: &[Landmark]) -> Option<f32> {
        let iris = point(landmarks, LEFT_IRIS)?;
        let corner = point(landmarks, LEFT_EYE_OUTER)?;
        Some((iris.x - corner.x).abs())
    }

    fn is_deviated(&self, value: f32) -> bool {
        value < self.epsilon
    }
}

fn point(landmarks: &[Landmark], idx: usize) -> Option<Landmark> {
    landmarks.get(idx).copied().filter(Landmark::is_finite)
}

fn eye_ratio(landmarks: &[Landmark], iris: usize, outer: usize, inner: usize) -> Option<f32> {
    let iris = point(landmarks, iris)?;
    let outer = point(landmarks, outer)?;
    let inner = point(landmarks, inner)?;

    let width = inner.x - outer.x;
    if width.abs() < MIN_EYE_WIDTH {
        return None;
    }

    let ratio = (iris.x - outer.x) / width;
    ratio.is_finite().then_some(ratio)
}
