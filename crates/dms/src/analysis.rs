//! Per-tick inputs, alert events, and display reports

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::geometry::FaceRatios;
use crate::state::{EyeStatus, PresenceStatus};

/// Alert categories, used for counting and asset lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlertKind {
    EyesClosed,
    Yawn,
    Absence,
    Break,
    Motivation,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EyesClosed => "eyes_closed",
            Self::Yawn => "yawn",
            Self::Absence => "absence",
            Self::Break => "break",
            Self::Motivation => "motivation",
        }
    }
}

/// Alert raised by the monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertEvent {
    /// Eyes stayed below the threshold past the cooldown
    EyesClosedSustained,

    /// Mouth opened past the yawn threshold
    Yawn,

    /// No face for longer than the grace period
    AbsenceSustained,

    /// Time for a break
    BreakDue,

    /// Time for some encouragement
    MotivationDue(String),
}

impl AlertEvent {
    pub fn kind(&self) -> AlertKind {
        match self {
            Self::EyesClosedSustained => AlertKind::EyesClosed,
            Self::Yawn => AlertKind::Yawn,
            Self::AbsenceSustained => AlertKind::Absence,
            Self::BreakDue => AlertKind::Break,
            Self::MotivationDue(_) => AlertKind::Motivation,
        }
    }
}

impl fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EyesClosedSustained => f.write_str("Eyes closed, wake up!"),
            Self::Yawn => f.write_str("Yawning detected"),
            Self::AbsenceSustained => f.write_str("You left your desk"),
            Self::BreakDue => f.write_str("Time for a break"),
            Self::MotivationDue(message) => f.write_str(message),
        }
    }
}

/// What the detectors saw in one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Observation {
    pub face_detected: bool,
    /// Mean eye aspect ratio, absent without a usable face
    pub eye_ratio: Option<f64>,
    /// Mouth aspect ratio, absent without a usable face
    pub mouth_ratio: Option<f64>,
}

impl Observation {
    /// A frame with no face in it
    pub fn absent() -> Self {
        Self::default()
    }

    /// A frame with a face and both ratios
    pub fn face(eye_ratio: f64, mouth_ratio: f64) -> Self {
        Self {
            face_detected: true,
            eye_ratio: Some(eye_ratio),
            mouth_ratio: Some(mouth_ratio),
        }
    }

    /// A frame with a face whose ratios may have been dropped
    pub fn from_ratios(ratios: FaceRatios) -> Self {
        Self {
            face_detected: true,
            eye_ratio: ratios.ear,
            mouth_ratio: ratios.mar,
        }
    }
}

/// Display output of one tick
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickReport {
    pub presence: PresenceStatus,
    pub eyes: EyeStatus,
    pub yawning: bool,
    /// Time since session start
    pub study_time: Duration,
    /// Latest motivational message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motivation: Option<String>,
    /// Alerts raised this tick
    pub alerts: Vec<AlertEvent>,
}

impl TickReport {
    /// Check if any alerts fired this tick
    pub fn has_alerts(&self) -> bool {
        !self.alerts.is_empty()
    }

    /// Study time formatted as `{m}m {s}s`
    pub fn study_time_label(&self) -> String {
        let secs = self.study_time.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Presence: {} | Eyes: {} | Yawning: {} | Study Time: {}",
            self.presence,
            self.eyes,
            if self.yawning { "Yes" } else { "No" },
            self.study_time_label()
        )?;
        if let Some(message) = &self.motivation {
            write!(f, " | {}", message)?;
        }
        Ok(())
    }
}
