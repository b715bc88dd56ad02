pub mod controller;
pub mod events;
pub mod heartbeat;
pub mod pipeline;
mod runner;
pub mod stats;

pub use controller::{SessionController, SessionHandle};
pub use events::{ChannelSink, EventSink, LogSink, MonitorEvent};
pub use heartbeat::SessionMonitor;
pub use pipeline::ViolationPipeline;
pub use runner::SessionSummary;
pub use stats::PipelineStats;
