//! Study monitor core
//!
//! Turns per-frame facial measurements into focus alerts:
//! - Eye and mouth aspect ratios from 68-point landmarks
//! - Personal eye-closure threshold calibration
//! - Drowsiness, yawn, and absence detection with cooldowns
//! - Break and motivation reminders

pub mod analysis;
pub mod calibration;
pub mod config;
pub mod detector;
pub mod dispatch;
pub mod geometry;
pub mod session;
pub mod state;
#[cfg(feature = "vision")]
pub mod vision;

pub use analysis::{AlertEvent, AlertKind, Observation, TickReport};
pub use calibration::{CalibrationDecision, CalibrationTracker};
pub use config::MonitorConfig;
pub use detector::{FaceBbox, FaceDetector, LandmarkPredictor, NoLandmarks};
pub use dispatch::{AlertDispatcher, NullDispatcher};
pub use geometry::{FaceLandmarks, FaceRatios, LandmarkPoint};
pub use session::{Session, SessionSummary};
pub use state::{DetectionState, EyeStatus, PresenceStatus};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

use state::since;

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Keypoints missing for feature calculation")]
    KeypointsMissing,

    #[error("Degenerate landmark geometry: {0}")]
    DegenerateGeometry(&'static str),
}

/// Detection state machine: one tick in, display report and alerts out
pub struct FocusMonitor {
    config: MonitorConfig,
    state: DetectionState,
    rng: StdRng,
}

impl FocusMonitor {
    /// Create a monitor whose session starts at `start`
    pub fn new(config: MonitorConfig, start: Instant) -> Result<Self, DmsError> {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, start, rng)
    }

    /// Create a monitor with an explicit message-selection source
    pub fn with_rng(config: MonitorConfig, start: Instant, rng: StdRng) -> Result<Self, DmsError> {
        config.validate()?;
        Ok(Self {
            state: DetectionState::new(start, &config),
            config,
            rng,
        })
    }

    /// Process one tick's observation
    pub fn observe(&mut self, observation: &Observation, now: Instant) -> TickReport {
        let mut alerts = Vec::new();

        let presence = self.update_presence(observation.face_detected, &mut alerts);

        if observation.face_detected {
            if let Some(ear) = observation.eye_ratio {
                self.update_eyes(ear, now, &mut alerts);
            }
        }

        let yawning = match observation.mouth_ratio {
            Some(mar) if observation.face_detected => self.update_yawn(mar, now, &mut alerts),
            _ => false,
        };

        self.update_reminders(now, &mut alerts);

        for alert in &alerts {
            info!("Alert raised: {}", alert.kind().as_str());
        }

        TickReport {
            presence,
            eyes: self.state.eye_status,
            yawning,
            study_time: self.state.elapsed(now),
            motivation: self.state.active_message.clone(),
            alerts,
        }
    }

    fn update_presence(&mut self, face_detected: bool, alerts: &mut Vec<AlertEvent>) -> PresenceStatus {
        let state = &mut self.state;
        state.face_present = face_detected;

        if face_detected {
            state.consecutive_absence_ticks = 0;
            state.absence_alert_fired = false;
        } else {
            state.consecutive_absence_ticks = state.consecutive_absence_ticks.saturating_add(1);
        }

        if state.consecutive_absence_ticks > self.config.absence_grace_ticks && !state.absence_alert_fired {
            state.absence_alert_fired = true;
            alerts.push(AlertEvent::AbsenceSustained);
        }

        if face_detected {
            PresenceStatus::Detected
        } else {
            PresenceStatus::NotDetected
        }
    }

    fn update_eyes(&mut self, ear: f64, now: Instant, alerts: &mut Vec<AlertEvent>) {
        let state = &mut self.state;

        if !state.calibration.is_calibrated() {
            let elapsed = state.elapsed(now);
            let decision = state.calibration.record_sample(
                ear,
                elapsed,
                self.config.calibration_window(),
            );
            debug!("Calibration: {:?}", decision);
            if !state.calibration.is_calibrated() {
                return;
            }
        }

        if ear < state.calibration.threshold() {
            state.eye_status = EyeStatus::Closed;
            // Re-arming here makes sustained closure repeat every cooldown period
            if since(now, state.last_eyes_open_time) > self.config.eye_closed_cooldown() {
                state.last_eyes_open_time = now;
                alerts.push(AlertEvent::EyesClosedSustained);
            }
        } else {
            state.eye_status = EyeStatus::Open;
            state.last_eyes_open_time = now;
        }
    }

    fn update_yawn(&mut self, mar: f64, now: Instant, alerts: &mut Vec<AlertEvent>) -> bool {
        if mar <= self.config.yawn_mar_threshold {
            return false;
        }
        let cooled_down = self
            .state
            .last_yawn_time
            .map_or(true, |last| since(now, last) > self.config.yawn_cooldown());
        if !cooled_down {
            return false;
        }

        self.state.last_yawn_time = Some(now);
        alerts.push(AlertEvent::Yawn);
        true
    }

    fn update_reminders(&mut self, now: Instant, alerts: &mut Vec<AlertEvent>) {
        if since(now, self.state.last_break_time) > self.config.break_interval() {
            self.state.last_break_time = now;
            alerts.push(AlertEvent::BreakDue);
        }

        if since(now, self.state.last_motivation_time) > self.config.motivation_interval() {
            self.state.last_motivation_time = now;
            if let Some(message) = self.config.motivational_messages.choose(&mut self.rng) {
                self.state.active_message = Some(message.clone());
                alerts.push(AlertEvent::MotivationDue(message.clone()));
            }
        }
    }

    /// Current detection state
    pub fn state(&self) -> &DetectionState {
        &self.state
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Closed-eye threshold in force (default until calibrated)
    pub fn ear_threshold(&self) -> f64 {
        self.state.calibration.threshold()
    }

    pub fn is_calibrated(&self) -> bool {
        self.state.calibration.is_calibrated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    fn at(start: Instant, secs: f64) -> Instant {
        start + Duration::from_secs_f64(secs)
    }

    fn monitor(start: Instant) -> FocusMonitor {
        let config = MonitorConfig {
            rng_seed: Some(7),
            ..Default::default()
        };
        FocusMonitor::new(config, start).unwrap()
    }

    fn count(report: &TickReport, kind: AlertKind) -> usize {
        report.alerts.iter().filter(|a| a.kind() == kind).count()
    }

    fn at_ms(start: Instant, ms: u64) -> Instant {
        start + Duration::from_millis(ms)
    }

    /// Feed a steady EAR every 100ms over [from_ms, to_ms)
    fn feed_eyes(m: &mut FocusMonitor, start: Instant, from_ms: u64, to_ms: u64, ear: f64) -> Vec<(u64, TickReport)> {
        (from_ms..to_ms)
            .step_by(100)
            .map(|t| (t, m.observe(&Observation::face(ear, 0.1), at_ms(start, t))))
            .collect()
    }

    #[test]
    fn test_calibration_then_closure_repeats_every_five_seconds() {
        let start = Instant::now();
        let mut m = monitor(start);

        feed_eyes(&mut m, start, 0, 5_000, 0.30);
        assert!(!m.is_calibrated());

        // Completion tick, eyes still open
        let report = m.observe(&Observation::face(0.30, 0.1), at_ms(start, 5_000));
        assert!(m.is_calibrated());
        assert!((m.ear_threshold() - 0.225).abs() < 1e-9);
        assert_eq!(report.eyes, EyeStatus::Open);

        let reports = feed_eyes(&mut m, start, 5_100, 16_100, 0.10);
        let fired: Vec<u64> = reports
            .iter()
            .filter(|(_, r)| count(r, AlertKind::EyesClosed) > 0)
            .map(|(t, _)| *t)
            .collect();

        // Last open sighting was t=5.0s; the alert re-arms itself
        assert_eq!(fired, vec![10_100, 15_200]);
        assert!(reports.iter().all(|(_, r)| r.eyes == EyeStatus::Closed));
    }

    #[test]
    fn test_no_closure_alert_before_calibration() {
        let start = Instant::now();
        let mut m = monitor(start);
        let reports = feed_eyes(&mut m, start, 0, 4_900, 0.0);
        assert!(reports.iter().all(|(_, r)| !r.has_alerts()));
        assert!(reports.iter().all(|(_, r)| r.eyes == EyeStatus::Unknown));
    }

    #[test]
    fn test_opening_eyes_resets_closure_timer() {
        let start = Instant::now();
        let mut m = monitor(start);
        feed_eyes(&mut m, start, 0, 5_100, 0.30);
        assert!(m.is_calibrated());

        // 4s closed, one open frame, 4s closed: never reaches the cooldown
        let closed = feed_eyes(&mut m, start, 5_100, 9_100, 0.05);
        m.observe(&Observation::face(0.30, 0.1), at_ms(start, 9_100));
        let closed_again = feed_eyes(&mut m, start, 9_200, 13_200, 0.05);

        assert!(closed
            .iter()
            .chain(&closed_again)
            .all(|(_, r)| count(r, AlertKind::EyesClosed) == 0));
    }

    #[test]
    fn test_overflowing_landmarks_do_not_poison_calibration() {
        let start = Instant::now();
        let mut m = monitor(start);
        let huge = geometry::tests::overflowing_face();

        for t in (0..5_000).step_by(100) {
            let obs = if t % 200 == 0 {
                Observation::from_ratios(huge.ratios())
            } else {
                Observation::face(0.30, 0.1)
            };
            m.observe(&obs, at_ms(start, t));
        }
        assert!(m.state().calibration.samples().iter().all(|s| s.is_finite()));

        m.observe(&Observation::face(0.30, 0.1), at_ms(start, 5_000));
        assert!(m.is_calibrated());
        assert!((m.ear_threshold() - 0.225).abs() < 1e-9);

        let reports = feed_eyes(&mut m, start, 5_100, 11_000, 0.0);
        assert!(reports
            .iter()
            .any(|(_, r)| r.alerts.contains(&AlertEvent::EyesClosedSustained)));
    }

    #[test]
    fn test_yawn_cooldown_timeline() {
        let start = Instant::now();
        let mut m = monitor(start);

        let r0 = m.observe(&Observation::face(0.3, 0.6), at(start, 0.0));
        assert_eq!(count(&r0, AlertKind::Yawn), 1);
        assert!(r0.yawning);

        let r1 = m.observe(&Observation::face(0.3, 0.6), at(start, 1.0));
        assert_eq!(count(&r1, AlertKind::Yawn), 0);
        assert!(!r1.yawning);

        let r2 = m.observe(&Observation::face(0.3, 0.3), at(start, 2.0));
        assert_eq!(count(&r2, AlertKind::Yawn), 0);

        let r4 = m.observe(&Observation::face(0.3, 0.6), at(start, 4.0));
        assert_eq!(count(&r4, AlertKind::Yawn), 1);
    }

    #[test]
    fn test_yawn_at_threshold_does_not_fire() {
        let start = Instant::now();
        let mut m = monitor(start);
        let report = m.observe(&Observation::face(0.3, 0.5), start);
        assert!(!report.yawning);
    }

    #[test]
    fn test_absence_fires_once_per_episode() {
        let start = Instant::now();
        let mut m = monitor(start);
        let mut t = 0.0;
        let absent_run = |m: &mut FocusMonitor, ticks: usize, t: &mut f64| -> usize {
            let mut fired = 0;
            for _ in 0..ticks {
                *t += 0.01;
                let r = m.observe(&Observation::absent(), at(start, *t));
                assert_eq!(r.presence, PresenceStatus::NotDetected);
                fired += count(&r, AlertKind::Absence);
            }
            fired
        };

        assert_eq!(absent_run(&mut m, 50, &mut t), 0);
        assert_eq!(absent_run(&mut m, 1, &mut t), 1);
        assert_eq!(absent_run(&mut m, 200, &mut t), 0);

        let r = m.observe(&Observation::face(0.3, 0.1), at(start, t + 0.01));
        assert_eq!(r.presence, PresenceStatus::Detected);
        assert_eq!(m.state().consecutive_absence_ticks, 0);
        t += 0.01;

        assert_eq!(absent_run(&mut m, 51, &mut t), 1);
    }

    #[test]
    fn test_face_without_ratios_counts_as_present() {
        let start = Instant::now();
        let mut m = monitor(start);
        for i in 0..60 {
            let obs = Observation {
                face_detected: true,
                eye_ratio: None,
                mouth_ratio: None,
            };
            let r = m.observe(&obs, at(start, i as f64 * 0.1));
            assert!(!r.has_alerts());
        }
        assert!(m.state().calibration.samples().is_empty());
    }

    #[test]
    fn test_ratios_ignored_without_face() {
        let start = Instant::now();
        let mut m = monitor(start);
        let obs = Observation {
            face_detected: false,
            eye_ratio: Some(0.3),
            mouth_ratio: Some(0.9),
        };
        let r = m.observe(&obs, start);
        assert!(!r.yawning);
        assert!(m.state().calibration.samples().is_empty());
    }

    #[test]
    fn test_break_and_motivation_reminders() {
        let start = Instant::now();
        let mut m = monitor(start);

        let r = m.observe(&Observation::absent(), at(start, 60.0));
        assert_eq!(count(&r, AlertKind::Motivation), 0);

        let r = m.observe(&Observation::absent(), at(start, 60.5));
        assert_eq!(count(&r, AlertKind::Motivation), 1);
        let Some(AlertEvent::MotivationDue(message)) = r.alerts.iter().find(|a| a.kind() == AlertKind::Motivation) else {
            panic!("missing motivation alert");
        };
        assert!(config::DEFAULT_MOTIVATIONAL_MESSAGES.contains(&message.as_str()));
        assert_eq!(r.motivation.as_deref(), Some(message.as_str()));

        // The message stays on display between reminders
        let r = m.observe(&Observation::absent(), at(start, 70.0));
        assert_eq!(r.motivation.as_deref(), Some(message.as_str()));

        let r = m.observe(&Observation::absent(), at(start, 2_700.0));
        assert_eq!(count(&r, AlertKind::Break), 0);
        let r = m.observe(&Observation::absent(), at(start, 2_700.5));
        assert_eq!(count(&r, AlertKind::Break), 1);
        let r = m.observe(&Observation::absent(), at(start, 2_701.0));
        assert_eq!(count(&r, AlertKind::Break), 0);
    }

    #[test]
    fn test_seeded_messages_are_deterministic() {
        let start = Instant::now();
        let messages = |seed: u64| -> Vec<String> {
            let config = MonitorConfig {
                rng_seed: Some(seed),
                motivation_interval_secs: 1,
                ..Default::default()
            };
            let mut m = FocusMonitor::new(config, start).unwrap();
            (1..=20)
                .filter_map(|i| m.observe(&Observation::absent(), at(start, i as f64 * 1.5)).motivation)
                .collect()
        };
        assert_eq!(messages(42), messages(42));
        assert_eq!(messages(42).len(), 20);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MonitorConfig {
            motivational_messages: vec![],
            ..Default::default()
        };
        assert!(matches!(
            FocusMonitor::new(config, Instant::now()),
            Err(DmsError::Config(_))
        ));
    }

    proptest! {
        #[test]
        fn pt_yawns_separated_by_cooldown(gaps in prop::collection::vec(1_u64..2_000, 1..300)) {
            let start = Instant::now();
            let mut m = monitor(start);
            let mut t = Duration::ZERO;
            let mut last: Option<Duration> = None;
            for gap in gaps {
                t += Duration::from_millis(gap);
                let r = m.observe(&Observation::face(0.3, 0.8), start + t);
                if r.yawning {
                    if let Some(prev) = last {
                        prop_assert!(t - prev > Duration::from_secs(3));
                    }
                    last = Some(t);
                }
            }
        }

        #[test]
        fn pt_closure_alerts_rate_limited(gaps in prop::collection::vec(10_u64..500, 1..400)) {
            let start = Instant::now();
            let mut m = monitor(start);
            m.observe(&Observation::face(0.3, 0.1), start + Duration::from_secs(5));
            prop_assert!(m.is_calibrated());

            let mut t = Duration::from_secs(5);
            let mut fired = Vec::new();
            for gap in gaps {
                t += Duration::from_millis(gap);
                let r = m.observe(&Observation::face(0.05, 0.1), start + t);
                if r.alerts.contains(&AlertEvent::EyesClosedSustained) {
                    fired.push(t);
                }
            }

            let closed_for = t - Duration::from_secs(5);
            for pair in fired.windows(2) {
                prop_assert!(pair[1] - pair[0] > Duration::from_secs(5));
            }
            // Ticks are at most 0.5s apart, so every 5.5s of closure yields an alert
            let expected_min = (closed_for.as_secs_f64() / 5.5).floor() as usize;
            prop_assert!(fired.len() >= expected_min);
        }
    }
}
