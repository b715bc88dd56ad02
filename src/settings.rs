use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::ParticipantIdentity;

pub const SERVER_URL_ENV: &str = "PROCTORWATCH_SERVER_URL";

/// Persistence thresholds, in consecutive frames, per signal kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceSettings {
    pub gaze_frames: u32,
    pub occlusion_frames: u32,
    pub object_frames: u32,
    /// Focus loss is edge-triggered upstream, so 0 (fire on first observation) is typical.
    pub focus_frames: u32,
    /// After firing, stay silent until a negative reading clears the run.
    pub latch_until_clear: bool,
}

impl Default for DebounceSettings {
    fn default() -> Self {
        Self {
            gaze_frames: 5,
            occlusion_frames: 3,
            object_frames: 2,
            focus_frames: 0,
            latch_until_clear: false,
        }
    }
}

/// Gaze deviation strategy.
///
/// `Ratio` divides the iris offset by eye width, which holds up as the participant
/// moves toward or away from the camera. `AbsoluteDistance` compares the raw
/// iris-to-corner distance against a fixed epsilon; simpler, but the right epsilon
/// depends on how far the participant sits from the camera.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum GazePolicy {
    Ratio { half_band: f32 },
    AbsoluteDistance { epsilon: f32 },
}

impl Default for GazePolicy {
    fn default() -> Self {
        GazePolicy::AbsoluteDistance { epsilon: 0.012 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcclusionSettings {
    /// Mean luma (0–255) below which the camera counts as covered.
    pub darkness_threshold: f32,
    pub sample_width: u32,
    pub sample_height: u32,
}

impl Default for OcclusionSettings {
    fn default() -> Self {
        Self {
            darkness_threshold: 40.0,
            sample_width: 32,
            sample_height: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchedClass {
    pub class_id: u32,
    pub label: String,
    pub min_confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectSettings {
    pub watched: Vec<WatchedClass>,
}

impl Default for ObjectSettings {
    fn default() -> Self {
        // COCO ids as emitted by the YOLOv8 export.
        Self {
            watched: vec![
                WatchedClass {
                    class_id: 67,
                    label: "cell phone".into(),
                    min_confidence: 0.55,
                },
                WatchedClass {
                    class_id: 73,
                    label: "book".into(),
                    min_confidence: 0.55,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    pub cooldown_ms: u64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self { cooldown_ms: 5_000 }
    }
}

impl AlertSettings {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceSettings {
    pub width: u32,
    pub height: u32,
    /// JPEG quality, 1–100.
    pub jpeg_quality: u8,
}

impl Default for EvidenceSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            jpeg_quality: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub base_url: String,
    pub alert_path: String,
    pub heartbeat_path: String,
    pub request_timeout_ms: u64,
    pub heartbeat_interval_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".into(),
            alert_path: "/api/alerta".into(),
            heartbeat_path: "/api/heartbeat".into(),
            request_timeout_ms: 10_000,
            heartbeat_interval_ms: 30_000,
        }
    }
}

impl ServerSettings {
    pub fn alert_url(&self) -> String {
        join_url(&self.base_url, &self.alert_path)
    }

    pub fn heartbeat_url(&self) -> String {
        join_url(&self.base_url, &self.heartbeat_path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.max(1))
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Every knob that distinguishes one deployment from another.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub identity: ParticipantIdentity,
    pub debounce: DebounceSettings,
    pub gaze: GazePolicy,
    pub occlusion: OcclusionSettings,
    pub objects: ObjectSettings,
    pub alert: AlertSettings,
    pub evidence: EvidenceSettings,
    pub server: ServerSettings,
}

impl MonitorConfig {
    /// Load from a JSON file. A missing file yields defaults; the server URL
    /// can be overridden through [`SERVER_URL_ENV`].
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            Self::from_json(&contents)
                .with_context(|| format!("Failed to parse config at {}", path.display()))?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var(SERVER_URL_ENV) {
            if !url.trim().is_empty() {
                config.server.base_url = url.trim().to_string();
            }
        }

        Ok(config)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(contents).context("invalid monitor config")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = MonitorConfig::from_json("{}").unwrap();
        assert_eq!(config.debounce.gaze_frames, 5);
        assert_eq!(config.alert.cooldown_ms, 5_000);
        assert_eq!(config.gaze, GazePolicy::AbsoluteDistance { epsilon: 0.012 });
        assert_eq!(config.objects.watched.len(), 2);
        assert_eq!(config.evidence.jpeg_quality, 60);
    }

    #[test]
    fn parses_ratio_policy_and_partial_sections() {
        let config = MonitorConfig::from_json(
            r#"{
                "identity": { "participant_id": "20231234", "participant_name": "Ana" },
                "gaze": { "policy": "ratio", "half_band": 0.2 },
                "alert": { "cooldown_ms": 4000 },
                "objects": { "watched": [ { "class_id": 67, "label": "phone", "min_confidence": 0.6 } ] }
            }"#,
        )
        .unwrap();

        assert_eq!(config.identity.participant_id, "20231234");
        assert_eq!(config.gaze, GazePolicy::Ratio { half_band: 0.2 });
        assert_eq!(config.alert.cooldown(), Duration::from_millis(4000));
        assert_eq!(config.objects.watched[0].label, "phone");
        assert_eq!(config.debounce.object_frames, 2);
    }

    #[test]
    fn urls_join_without_double_slashes() {
        let server = ServerSettings {
            base_url: "http://exam.local/".into(),
            ..Default::default()
        };
        assert_eq!(server.alert_url(), "http://exam.local/api/alerta");
        assert_eq!(server.heartbeat_url(), "http://exam.local/api/heartbeat");
    }

    #[test]
    fn missing_file_loads_defaults_with_env_override() {
        let path = std::env::temp_dir().join(format!("proctorwatch-{}.json", uuid::Uuid::new_v4()));
        std::env::set_var(SERVER_URL_ENV, " http://proctor.example:9000 ");
        let config = MonitorConfig::load(&path);
        std::env::remove_var(SERVER_URL_ENV);

        let config = config.unwrap();
        assert_eq!(config.server.base_url, "http://proctor.example:9000");
        assert_eq!(config.debounce.occlusion_frames, 3);
    }

    #[test]
    fn rejects_unknown_gaze_policy() {
        assert!(MonitorConfig::from_json(r#"{ "gaze": { "policy": "magic" } }"#).is_err());
    }
}
