use std::{collections::BTreeMap, sync::Arc};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use image::RgbaImage;
use log::info;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::alerting::{AlertDispatcher, EvidenceCapturer, FrameSource};
use crate::models::{Landmark, Observation, SessionState, SignalKind};
use crate::settings::MonitorConfig;

use super::events::EventSink;
use super::heartbeat::SessionMonitor;
use super::pipeline::ViolationPipeline;
use super::runner::{SessionInput, SessionRunner, SessionSummary};

const INPUT_QUEUE_DEPTH: usize = 256;

/// Inbound side of a running session, handed to the signal source adapter.
///
/// Cheap to clone. Every call is stamped with the current wall-clock time and
/// queued in order.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: Arc<str>,
    input_tx: mpsc::Sender<SessionInput>,
    state_rx: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    pub async fn on_landmarks(&self, landmarks: Vec<Landmark>) -> Result<()> {
        self.observe(Observation::Landmarks(landmarks)).await
    }

    pub async fn on_frame_sample(&self, frame: RgbaImage) -> Result<()> {
        self.observe(Observation::FrameSample(frame)).await
    }

    pub async fn on_detections(&self, per_class_max: BTreeMap<u32, f32>) -> Result<()> {
        self.observe(Observation::Detections(per_class_max)).await
    }

    pub async fn on_focus_lost(&self) -> Result<()> {
        self.observe(Observation::FocusLost).await
    }

    pub async fn on_focus_gained(&self) -> Result<()> {
        self.observe(Observation::FocusGained).await
    }

    pub async fn on_perception_error(&self, kind: SignalKind) -> Result<()> {
        self.observe(Observation::PerceptionError(kind)).await
    }

    pub async fn observe(&self, observation: Observation) -> Result<()> {
        self.input_tx
            .send(SessionInput::Observe {
                observation,
                at: Utc::now(),
            })
            .await
            .map_err(|_| anyhow!("session {} is no longer accepting signals", self.session_id))
    }

    /// Resolve once the session is locked. Errors if it ends any other way.
    pub async fn locked(&self) -> Result<()> {
        let mut rx = self.state_rx.clone();
        rx.wait_for(|state| state.is_locked())
            .await
            .map(|_| ())
            .map_err(|_| anyhow!("session {} ended without a lockout", self.session_id))
    }
}

/// Owns the session runner and heartbeat tasks.
///
/// Dropping the controller without `terminate` or `wait` cancels both tasks.
pub struct SessionController {
    handle: SessionHandle,
    tasks: SessionTasks,
}

struct SessionTasks {
    runner: JoinHandle<SessionSummary>,
    heartbeat: JoinHandle<()>,
    cancel_token: CancellationToken,
    _cancel_on_drop: DropGuard,
}

impl SessionController {
    /// Build the pipeline and spawn the session tasks. Must be called inside a
    /// tokio runtime.
    pub fn start(
        config: MonitorConfig,
        frames: Arc<dyn FrameSource>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let identity = config.identity.clone().with_session_id_or_generate();
        let session_id: Arc<str> = Arc::from(identity.session_id.as_str());

        let dispatcher = AlertDispatcher::new(&config.server, identity)
            .context("failed to create alert dispatcher")?;

        let pipeline = ViolationPipeline::new(&config);
        info!(
            "starting session {} (gaze policy: {}, cooldown: {}ms)",
            session_id,
            pipeline.engine().gaze_policy(),
            config.alert.cooldown_ms
        );

        let cancel_token = CancellationToken::new();
        let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE_DEPTH);
        let (state_tx, state_rx) = watch::channel(SessionState::Active);

        let runner = SessionRunner {
            pipeline,
            capturer: EvidenceCapturer::new(frames, config.evidence.clone()),
            dispatcher: dispatcher.clone(),
            sink,
            state_tx,
        };
        let runner = tokio::spawn(runner.run(input_rx, cancel_token.clone()));

        let monitor = SessionMonitor::new(dispatcher);
        let heartbeat = tokio::spawn(
            monitor.run(config.server.heartbeat_interval(), cancel_token.clone()),
        );

        Ok(Self {
            handle: SessionHandle {
                session_id,
                input_tx,
                state_rx,
            },
            tasks: SessionTasks {
                runner,
                heartbeat,
                _cancel_on_drop: cancel_token.clone().drop_guard(),
                cancel_token,
            },
        })
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> SessionState {
        self.handle.state()
    }

    /// End the session: stop accepting signals, cancel timers, and return the
    /// final summary.
    pub async fn terminate(self) -> Result<SessionSummary> {
        let Self { handle, tasks } = self;
        // The runner may already be gone after a lockout; that's fine.
        let _ = handle.input_tx.send(SessionInput::Terminate).await;
        drop(handle);
        tasks.join().await
    }

    /// Wait for the session to end on its own: a lockout, or every
    /// [`SessionHandle`] handed out being dropped.
    pub async fn wait(self) -> Result<SessionSummary> {
        let Self { handle, tasks } = self;
        // Our own sender must not keep the input queue open.
        drop(handle);
        tasks.join().await
    }
}

impl SessionTasks {
    async fn join(self) -> Result<SessionSummary> {
        let summary = self
            .runner
            .await
            .context("session runner task failed to join")?;

        self.cancel_token.cancel();
        self.heartbeat
            .await
            .context("heartbeat task failed to join")?;

        info!(
            "session {} finished in state {}",
            summary.session_id,
            summary.state.as_str()
        );
        Ok(summary)
    }
}
