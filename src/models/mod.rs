pub mod session;
pub mod signal;
pub mod violation;

pub use session::{ParticipantIdentity, SessionState};
pub use signal::{Landmark, Observation, SignalKind, SignalReading, SignalValue};
pub use violation::{ViolationEvent, ViolationKind};
