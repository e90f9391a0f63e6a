//! Personal eye-closure threshold learned during the warm-up window

use std::time::Duration;
use tracing::info;

/// Outcome of feeding one sample to the tracker
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationDecision {
    /// Still inside the window; `samples` collected so far
    Calibrating { samples: usize },
    /// This call closed the window
    Completed { threshold: f64 },
    /// Window closed on an earlier call; nothing changed
    AlreadyCalibrated { threshold: f64 },
}

/// Calibration state (one per session)
#[derive(Debug, Clone)]
pub struct CalibrationTracker {
    collected_samples: Vec<f64>,
    is_calibrated: bool,
    threshold: f64,
    scale: f64,
}

impl CalibrationTracker {
    /// `default_threshold` stays in force until calibration produces a value
    pub fn new(default_threshold: f64, scale: f64) -> Self {
        Self {
            collected_samples: Vec::new(),
            is_calibrated: false,
            threshold: default_threshold,
            scale,
        }
    }

    /// Record one EAR sample taken `elapsed` after session start.
    pub fn record_sample(
        &mut self,
        ratio: f64,
        elapsed: Duration,
        window: Duration,
    ) -> CalibrationDecision {
        if self.is_calibrated {
            return CalibrationDecision::AlreadyCalibrated {
                threshold: self.threshold,
            };
        }

        if elapsed < window {
            self.collected_samples.push(ratio);
            return CalibrationDecision::Calibrating {
                samples: self.collected_samples.len(),
            };
        }

        if let Some(mean) = self.mean() {
            self.threshold = mean * self.scale;
            info!(
                "Calibration complete: mean EAR {:.3} over {} samples, threshold {:.3}",
                mean,
                self.collected_samples.len(),
                self.threshold
            );
        } else {
            info!(
                "Calibration window closed with no samples, keeping default threshold {:.3}",
                self.threshold
            );
        }
        self.is_calibrated = true;

        CalibrationDecision::Completed {
            threshold: self.threshold,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.is_calibrated
    }

    /// Current closed-eye threshold (the default until calibrated)
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn samples(&self) -> &[f64] {
        &self.collected_samples
    }

    fn mean(&self) -> Option<f64> {
        if self.collected_samples.is_empty() {
            return None;
        }
        Some(self.collected_samples.iter().sum::<f64>() / self.collected_samples.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const WINDOW: Duration = Duration::from_secs(5);

    #[test]
    fn test_collects_inside_window() {
        let mut tracker = CalibrationTracker::new(0.2, 0.75);
        assert_eq!(
            tracker.record_sample(0.3, Duration::from_secs(0), WINDOW),
            CalibrationDecision::Calibrating { samples: 1 }
        );
        assert_eq!(
            tracker.record_sample(0.3, Duration::from_millis(4_999), WINDOW),
            CalibrationDecision::Calibrating { samples: 2 }
        );
        assert!(!tracker.is_calibrated());
        assert_eq!(tracker.threshold(), 0.2);
    }

    #[test]
    fn test_completion_uses_scaled_mean() {
        let mut tracker = CalibrationTracker::new(0.2, 0.75);
        tracker.record_sample(0.28, Duration::from_secs(1), WINDOW);
        tracker.record_sample(0.32, Duration::from_secs(2), WINDOW);

        let decision = tracker.record_sample(0.9, WINDOW, WINDOW);
        let CalibrationDecision::Completed { threshold } = decision else {
            panic!("expected completion, got {:?}", decision);
        };
        assert!((threshold - 0.225).abs() < 1e-12);
        // The completing sample is not part of the mean
        assert_eq!(tracker.samples().len(), 2);
        assert!(tracker.is_calibrated());
    }

    #[test]
    fn test_no_samples_keeps_default() {
        let mut tracker = CalibrationTracker::new(0.2, 0.75);
        assert_eq!(
            tracker.record_sample(0.4, Duration::from_secs(6), WINDOW),
            CalibrationDecision::Completed { threshold: 0.2 }
        );
        assert_eq!(tracker.threshold(), 0.2);
    }

    #[test]
    fn test_already_calibrated_is_noop() {
        let mut tracker = CalibrationTracker::new(0.2, 0.75);
        tracker.record_sample(0.4, Duration::ZERO, WINDOW);
        tracker.record_sample(0.4, WINDOW, WINDOW);
        let threshold = tracker.threshold();

        for ratio in [0.01, 0.9, 0.5] {
            assert_eq!(
                tracker.record_sample(ratio, Duration::from_secs(60), WINDOW),
                CalibrationDecision::AlreadyCalibrated { threshold }
            );
        }
        assert_eq!(tracker.samples().len(), 1);
    }

    proptest! {
        #[test]
        fn pt_threshold_is_scaled_mean(samples in prop::collection::vec(0.05_f64..0.6, 1..200)) {
            let mut tracker = CalibrationTracker::new(0.2, 0.75);
            for (i, s) in samples.iter().enumerate() {
                let elapsed = WINDOW.mul_f64(i as f64 / samples.len() as f64);
                tracker.record_sample(*s, elapsed, WINDOW);
            }
            tracker.record_sample(0.0, WINDOW, WINDOW);

            let mean = samples.iter().sum::<f64>() / samples.len() as f64;
            prop_assert!((tracker.threshold() - mean * 0.75).abs() < 1e-9);

            let first = tracker.threshold();
            tracker.record_sample(1.0, WINDOW * 2, WINDOW);
            prop_assert_eq!(tracker.threshold(), first);
        }
    }
}
