//! Layered application configuration: defaults, optional file, environment

use alerting::AlertConfig;
use dms::MonitorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment prefix, e.g. `FOCUSPAL__MONITOR__YAWN_COOLDOWN_MS=4000`
pub const ENV_PREFIX: &str = "FOCUSPAL";

/// Host loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Poll interval of the host loop (milliseconds)
    pub poll_interval_ms: u64,
    /// Nominal rate of replayed image sequences
    pub replay_fps: u32,
    /// Frame size used when no image sequence is given
    pub frame_width: u32,
    pub frame_height: u32,
    /// Camera device for live monitoring
    pub camera_index: i32,
    /// Haar cascade used to find faces in live frames
    pub face_cascade: PathBuf,
    /// LBF landmark model; presence-only monitoring without it
    pub landmark_model: Option<PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            replay_fps: 30,
            frame_width: 640,
            frame_height: 480,
            camera_index: 0,
            face_cascade: PathBuf::from(
                "/usr/share/opencv4/haarcascades/haarcascade_frontalface_default.xml",
            ),
            landmark_model: None,
        }
    }
}

impl HostConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    pub alerts: AlertConfig,
    pub host: HostConfig,
}

impl AppConfig {
    /// Load configuration: built-in defaults, then `path` (if given), then environment
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(
        path: Option<&Path>,
        env: config::Environment,
    ) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder.add_source(env).build()?.try_deserialize()
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}
