//! Recorded landmark traces standing in for the live face models.
//!
//! Trace format, one JSON object per line:
//! `{"sequence": 12, "faces": [[[x, y], ... 68 points], ...]}`.
//! Frames missing from the trace have no face.

use camera_capture::VideoFrame;
use dms::{DmsError, FaceBbox, FaceDetector, FaceLandmarks, LandmarkPredictor};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Trace loading errors
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Failed to read landmark trace: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad landmark trace line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct TraceLine {
    sequence: u32,
    #[serde(default)]
    faces: Vec<FaceLandmarks>,
}

type FrameFaces = HashMap<u32, Vec<FaceLandmarks>>;

/// A loaded landmark trace
#[derive(Clone)]
pub struct ReplayLandmarks {
    frames: Arc<FrameFaces>,
}

impl ReplayLandmarks {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let trace = Self::from_reader(std::io::BufReader::new(file))?;
        info!(
            "Loaded landmark trace for {} frames from {}",
            trace.frames.len(),
            path.display()
        );
        Ok(trace)
    }

    pub fn from_reader(reader: impl BufRead) -> Result<Self, ReplayError> {
        let mut frames = FrameFaces::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed: TraceLine = serde_json::from_str(&line)
                .map_err(|source| ReplayError::Parse { line: idx + 1, source })?;
            frames.entry(parsed.sequence).or_default().extend(parsed.faces);
        }
        Ok(Self {
            frames: Arc::new(frames),
        })
    }

    /// Frames needed to replay the whole trace
    pub fn frame_count(&self) -> u32 {
        self.frames.keys().max().map_or(0, |last| last + 1)
    }

    pub fn detector(&self) -> ReplayDetector {
        ReplayDetector {
            frames: Arc::clone(&self.frames),
        }
    }

    pub fn predictor(&self) -> ReplayPredictor {
        ReplayPredictor {
            frames: Arc::clone(&self.frames),
        }
    }
}

/// Tight box around a landmark set
fn bbox_of(face: &FaceLandmarks) -> FaceBbox {
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in face.points() {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    FaceBbox {
        x: min_x as f32,
        y: min_y as f32,
        width: (max_x - min_x) as f32,
        height: (max_y - min_y) as f32,
        confidence: 1.0,
    }
}

/// Face detector that reports the recorded faces of each frame
pub struct ReplayDetector {
    frames: Arc<FrameFaces>,
}

impl FaceDetector for ReplayDetector {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<FaceBbox>, DmsError> {
        Ok(self
            .frames
            .get(&frame.sequence)
            .map(|faces| faces.iter().map(bbox_of).collect())
            .unwrap_or_default())
    }
}

/// Landmark predictor that looks up the recorded face behind a box
pub struct ReplayPredictor {
    frames: Arc<FrameFaces>,
}

impl LandmarkPredictor for ReplayPredictor {
    fn predict(&mut self, frame: &VideoFrame, face: &FaceBbox) -> Result<FaceLandmarks, DmsError> {
        self.frames
            .get(&frame.sequence)
            .and_then(|faces| faces.iter().find(|f| bbox_of(f) == *face))
            .cloned()
            .ok_or_else(|| {
                DmsError::Inference(format!("no recorded landmarks for frame {}", frame.sequence))
            })
    }
}
