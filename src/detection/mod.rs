pub mod counter;
pub mod engine;
pub mod gaze;
pub mod objects;
pub mod occlusion;

pub use counter::DebounceCounter;
pub use engine::DebounceEngine;
pub use gaze::{predicate_for, AbsoluteDistance, GazePredicate, RatioBand};
