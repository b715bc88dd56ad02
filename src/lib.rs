//! Multi-signal violation detection and alert dispatch for supervised sessions.
//!
//! Perception engines feed a [`SessionHandle`]; per-kind debounce counters turn
//! noisy per-frame signals into confirmed violations; a single-flight gate with
//! cooldown decides which of those become alerts; the dispatcher posts them with
//! a JPEG snapshot and locks the session when the authority answers `BLOCKED`.

pub mod alerting;
pub mod detection;
pub mod models;
pub mod session;
pub mod settings;
pub mod utils;

pub use alerting::{AlertDispatcher, AlertGate, DispatchOutcome, EvidenceImage, FrameSource, SharedFrame};
pub use detection::DebounceEngine;
pub use models::{
    Landmark, Observation, ParticipantIdentity, SessionState, SignalKind, SignalReading,
    SignalValue, ViolationEvent, ViolationKind,
};
pub use session::{
    ChannelSink, EventSink, LogSink, MonitorEvent, SessionController, SessionHandle,
    SessionSummary, ViolationPipeline,
};
pub use settings::{GazePolicy, MonitorConfig};
pub use utils::logging::init_logging;
