//! Replays a recorded signal stream through a live session.
//!
//! Reads JSON lines from stdin, e.g.
//! `{"type":"landmarks","points":[{"x":0.3,"y":0.4}, ...]}`,
//! `{"type":"detections","scores":{"67":0.81}}`, `{"type":"frame","path":"f001.jpg"}`,
//! `{"type":"focusLost"}`, `{"type":"focusGained"}`, `{"type":"gap","kind":"gaze"}`,
//! and prints UI events as JSON lines on stdout.

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use log::{info, warn};
use proctorwatch::{
    init_logging, ChannelSink, Landmark, MonitorConfig, SessionController, SessionHandle,
    SharedFrame, SignalKind,
};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};

const CONFIG_ENV: &str = "PROCTORWATCH_CONFIG";

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ReplayRecord {
    Landmarks { points: Vec<Landmark> },
    Detections { scores: BTreeMap<u32, f32> },
    Frame { path: PathBuf },
    FocusLost,
    FocusGained,
    Gap { kind: SignalKind },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV).ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("proctorwatch.json"));
    let config = MonitorConfig::load(&config_path)?;

    let frames = SharedFrame::new();
    let (sink, mut events) = ChannelSink::new();
    let controller = SessionController::start(config, Arc::new(frames.clone()), Arc::new(sink))?;
    let handle = controller.handle();

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(err) => warn!("failed to serialize event: {err}"),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        if handle.state().is_locked() {
            info!("session locked; ignoring remaining input from line {line_no}");
            break;
        }

        let record: ReplayRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(err) => {
                warn!("skipping line {line_no}: {err}");
                continue;
            }
        };

        if let Err(err) = feed(&handle, &frames, record).await {
            warn!("line {line_no}: {err:#}");
        }
    }

    let summary = controller.terminate().await?;
    drop(handle);
    let _ = printer.await;

    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

async fn feed(handle: &SessionHandle, frames: &SharedFrame, record: ReplayRecord) -> Result<()> {
    match record {
        ReplayRecord::Landmarks { points } => handle.on_landmarks(points).await,
        ReplayRecord::Detections { scores } => handle.on_detections(scores).await,
        ReplayRecord::Frame { path } => {
            let frame = image::open(&path)
                .with_context(|| format!("failed to load frame {}", path.display()))?
                .into_rgba8();
            frames.update(frame.clone());
            handle.on_frame_sample(frame).await
        }
        ReplayRecord::FocusLost => handle.on_focus_lost().await,
        ReplayRecord::FocusGained => handle.on_focus_gained().await,
        ReplayRecord::Gap { kind } => handle.on_perception_error(kind).await,
    }
}
