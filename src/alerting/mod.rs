pub mod dispatcher;
pub mod evidence;
pub mod gate;
pub mod payload;

pub use dispatcher::{AlertDispatcher, DispatchOutcome};
pub use evidence::{encode_jpeg, EvidenceCapturer, EvidenceImage, FrameSource, SharedFrame};
pub use gate::AlertGate;
pub use payload::{AlertPayload, AuthorityReply, HeartbeatPayload};
