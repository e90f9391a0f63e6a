//! Monitor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Messages shown when a motivation reminder comes due
pub const DEFAULT_MOTIVATIONAL_MESSAGES: [&str; 5] = [
    "Keep going, you're doing great!",
    "Stay sharp, you got this!",
    "One step at a time, you're winning!",
    "Keep your eyes on the goal!",
    "Hard work always pays off!",
];

/// Monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Warm-up period used to learn the personal eye threshold (milliseconds)
    pub calibration_window_ms: u64,

    /// Eyes closed longer than this raise an alert, repeating at the same period (milliseconds)
    pub eye_closed_cooldown_ms: u64,

    /// Minimum gap between yawn alerts (milliseconds)
    pub yawn_cooldown_ms: u64,

    /// Break reminder interval (seconds)
    pub break_interval_secs: u64,

    /// Motivation reminder interval (seconds)
    pub motivation_interval_secs: u64,

    /// Consecutive face-less ticks tolerated before the absence alert
    pub absence_grace_ticks: u32,

    /// Mouth aspect ratio above which the user is yawning
    pub yawn_mar_threshold: f64,

    /// Fraction of the calibrated mean EAR that counts as closed
    pub threshold_scale: f64,

    /// Eye threshold used until (or unless) calibration produces one
    pub default_ear_threshold: f64,

    /// Motivation message pool
    pub motivational_messages: Vec<String>,

    /// Seed for message selection; `None` seeds from the OS
    pub rng_seed: Option<u64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            calibration_window_ms: 5_000,
            eye_closed_cooldown_ms: 5_000,
            yawn_cooldown_ms: 3_000,
            break_interval_secs: 2_700,
            motivation_interval_secs: 60,
            absence_grace_ticks: 50,
            yawn_mar_threshold: 0.5,
            threshold_scale: 0.75,
            default_ear_threshold: 0.2,
            motivational_messages: DEFAULT_MOTIVATIONAL_MESSAGES
                .iter()
                .map(|m| m.to_string())
                .collect(),
            rng_seed: None,
        }
    }
}

impl MonitorConfig {
    pub fn calibration_window(&self) -> Duration {
        Duration::from_millis(self.calibration_window_ms)
    }

    pub fn eye_closed_cooldown(&self) -> Duration {
        Duration::from_millis(self.eye_closed_cooldown_ms)
    }

    pub fn yawn_cooldown(&self) -> Duration {
        Duration::from_millis(self.yawn_cooldown_ms)
    }

    pub fn break_interval(&self) -> Duration {
        Duration::from_secs(self.break_interval_secs)
    }

    pub fn motivation_interval(&self) -> Duration {
        Duration::from_secs(self.motivation_interval_secs)
    }

    /// Check values that would make the monitor meaningless
    pub fn validate(&self) -> Result<(), crate::DmsError> {
        if !(self.threshold_scale > 0.0 && self.threshold_scale <= 1.0) {
            return Err(crate::DmsError::Config(format!(
                "threshold_scale must be in (0, 1], got {}",
                self.threshold_scale
            )));
        }
        if !(self.default_ear_threshold > 0.0) {
            return Err(crate::DmsError::Config(format!(
                "default_ear_threshold must be positive, got {}",
                self.default_ear_threshold
            )));
        }
        if !(self.yawn_mar_threshold > 0.0) {
            return Err(crate::DmsError::Config(format!(
                "yawn_mar_threshold must be positive, got {}",
                self.yawn_mar_threshold
            )));
        }
        if self.motivational_messages.is_empty() {
            return Err(crate::DmsError::Config(
                "motivational_messages must not be empty".into(),
            ));
        }
        Ok(())
    }
}
