//! Per-session detection state

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

use crate::calibration::CalibrationTracker;
use crate::config::MonitorConfig;

/// Presence as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PresenceStatus {
    #[default]
    Unknown,
    Detected,
    NotDetected,
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "Unknown",
            Self::Detected => "Detected",
            Self::NotDetected => "Not Detected",
        })
    }
}

/// Eye state as shown to the user.
///
/// Stays `Unknown` until calibration finishes, and keeps its last value on
/// ticks without a usable eye ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EyeStatus {
    #[default]
    Unknown,
    Open,
    Closed,
}

impl fmt::Display for EyeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "Unknown",
            Self::Open => "Open",
            Self::Closed => "Closed",
        })
    }
}

/// Detection state (one per session, owned by the monitor)
#[derive(Debug, Clone)]
pub struct DetectionState {
    /// Whether the last tick saw a face
    pub face_present: bool,

    /// Ticks in a row without a face
    pub consecutive_absence_ticks: u32,

    /// Absence alert already raised for the current episode
    pub absence_alert_fired: bool,

    /// Last time eyes were seen open (or the closed alert re-armed)
    pub last_eyes_open_time: Instant,

    /// Last yawn alert; `None` until the first yawn
    pub last_yawn_time: Option<Instant>,

    /// Last break reminder
    pub last_break_time: Instant,

    /// Last motivation reminder
    pub last_motivation_time: Instant,

    /// Session start
    pub session_start_time: Instant,

    /// Last displayed eye status
    pub eye_status: EyeStatus,

    /// Message from the latest motivation reminder
    pub active_message: Option<String>,

    /// Eye threshold calibration
    pub calibration: CalibrationTracker,
}

impl DetectionState {
    /// Fresh state for a session starting at `start`
    pub fn new(start: Instant, config: &MonitorConfig) -> Self {
        Self {
            face_present: false,
            consecutive_absence_ticks: 0,
            absence_alert_fired: false,
            last_eyes_open_time: start,
            last_yawn_time: None,
            last_break_time: start,
            last_motivation_time: start,
            session_start_time: start,
            eye_status: EyeStatus::Unknown,
            active_message: None,
            calibration: CalibrationTracker::new(
                config.default_ear_threshold,
                config.threshold_scale,
            ),
        }
    }

    /// Study time so far
    pub fn elapsed(&self, now: Instant) -> Duration {
        since(now, self.session_start_time)
    }
}

/// `now - then`, clamped at zero for out-of-order timestamps
pub(crate) fn since(now: Instant, then: Instant) -> Duration {
    now.saturating_duration_since(then)
}
