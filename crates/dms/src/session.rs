//! Session lifecycle: detectors, monitor, and dispatcher wired together

use camera_capture::VideoFrame;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::analysis::{AlertKind, Observation, TickReport};
use crate::config::MonitorConfig;
use crate::detector::{FaceDetector, LandmarkPredictor};
use crate::dispatch::AlertDispatcher;
use crate::{DmsError, FocusMonitor};

/// What a finished session amounted to
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub duration: Duration,
    /// Ticks that reached the monitor
    pub ticks: u64,
    /// Ticks dropped for want of a usable frame
    pub skipped_frames: u64,
    pub alerts: BTreeMap<AlertKind, u32>,
    pub calibrated: bool,
    pub ear_threshold: f64,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.duration.as_secs();
        write!(
            f,
            "Studied {}m {}s over {} ticks ({} skipped), EAR threshold {:.3}{}",
            secs / 60,
            secs % 60,
            self.ticks,
            self.skipped_frames,
            self.ear_threshold,
            if self.calibrated { "" } else { " (uncalibrated)" }
        )?;
        for (kind, count) in &self.alerts {
            write!(f, ", {} {}", kind.as_str(), count)?;
        }
        Ok(())
    }
}

/// One monitored study session
pub struct Session {
    monitor: FocusMonitor,
    detector: Box<dyn FaceDetector>,
    predictor: Box<dyn LandmarkPredictor>,
    dispatcher: Box<dyn AlertDispatcher>,
    ticks: u64,
    skipped_frames: u64,
    alert_counts: BTreeMap<AlertKind, u32>,
}

impl Session {
    /// Start a session at `now`
    pub fn start(
        config: MonitorConfig,
        detector: impl FaceDetector + 'static,
        predictor: impl LandmarkPredictor + 'static,
        dispatcher: impl AlertDispatcher + 'static,
        now: Instant,
    ) -> Result<Self, DmsError> {
        let monitor = FocusMonitor::new(config, now)?;
        info!(
            "Session started (calibration window {:?}, default EAR threshold {:.2})",
            monitor.config().calibration_window(),
            monitor.ear_threshold()
        );
        Ok(Self {
            monitor,
            detector: Box::new(detector),
            predictor: Box::new(predictor),
            dispatcher: Box::new(dispatcher),
            ticks: 0,
            skipped_frames: 0,
            alert_counts: BTreeMap::new(),
        })
    }

    /// Run one frame through detection and the monitor.
    ///
    /// Returns `None` when the tick was skipped: no frame, a malformed frame,
    /// or a face detector failure.
    pub fn tick(&mut self, frame: Option<&VideoFrame>, now: Instant) -> Option<TickReport> {
        let Some(frame) = frame else {
            debug!("No frame available, skipping tick");
            self.skipped_frames += 1;
            return None;
        };

        if !frame.is_well_formed() {
            warn!(
                "Frame {} has {} bytes for {}x{}, skipping",
                frame.sequence,
                frame.data.len(),
                frame.width,
                frame.height
            );
            self.skipped_frames += 1;
            return None;
        }

        match self.observe_frame(frame) {
            Ok(observation) => Some(self.observe(observation, now)),
            Err(e) => {
                warn!("Face detection failed on frame {}: {}", frame.sequence, e);
                self.skipped_frames += 1;
                None
            }
        }
    }

    /// Feed an already-measured observation, bypassing the detectors
    pub fn observe(&mut self, observation: Observation, now: Instant) -> TickReport {
        let report = self.monitor.observe(&observation, now);
        self.ticks += 1;

        for alert in &report.alerts {
            *self.alert_counts.entry(alert.kind()).or_insert(0) += 1;
            self.dispatcher.dispatch(alert);
        }

        report
    }

    /// End the session
    pub fn stop(self, now: Instant) -> SessionSummary {
        let summary = SessionSummary {
            duration: self.monitor.state().elapsed(now),
            ticks: self.ticks,
            skipped_frames: self.skipped_frames,
            alerts: self.alert_counts,
            calibrated: self.monitor.is_calibrated(),
            ear_threshold: self.monitor.ear_threshold(),
        };
        info!("Session stopped: {}", summary);
        summary
    }

    pub fn monitor(&self) -> &FocusMonitor {
        &self.monitor
    }

    /// Measure the largest face in the frame
    fn observe_frame(&mut self, frame: &VideoFrame) -> Result<Observation, DmsError> {
        let faces = self.detector.detect(frame)?;
        let Some(primary) = faces.iter().max_by(|a, b| a.area().total_cmp(&b.area())) else {
            return Ok(Observation::absent());
        };

        match self.predictor.predict(frame, primary) {
            Ok(landmarks) => Ok(Observation::from_ratios(landmarks.ratios())),
            Err(e) => {
                // The face is there even if its landmarks are not usable
                debug!("Landmark prediction failed on frame {}: {}", frame.sequence, e);
                Ok(Observation {
                    face_detected: true,
                    eye_ratio: None,
                    mouth_ratio: None,
                })
            }
        }
    }
}
