//! Face and landmark model seams

use camera_capture::VideoFrame;
use serde::{Deserialize, Serialize};

use crate::geometry::FaceLandmarks;
use crate::DmsError;

/// Face bounding box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceBbox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

impl FaceBbox {
    /// Box covering the whole frame, for detectors that only answer "is there a face"
    pub fn full_frame(frame: &VideoFrame) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: frame.width as f32,
            height: frame.height as f32,
            confidence: 1.0,
        }
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// Finds face regions in a frame (cascade, BlazeFace, ...)
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<FaceBbox>, DmsError>;
}

/// Places the 68 facial landmarks inside a detected face region
pub trait LandmarkPredictor: Send {
    fn predict(&mut self, frame: &VideoFrame, face: &FaceBbox) -> Result<FaceLandmarks, DmsError>;
}

/// Predictor for presence-only monitoring: every face comes back without
/// landmarks, so eyes and yawns are never evaluated.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLandmarks;

impl LandmarkPredictor for NoLandmarks {
    fn predict(&mut self, _frame: &VideoFrame, _face: &FaceBbox) -> Result<FaceLandmarks, DmsError> {
        Err(DmsError::Inference("no landmark model loaded".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_frame_bbox() {
        let frame = VideoFrame::blank(640, 480, 0);
        let bbox = FaceBbox::full_frame(&frame);
        assert_eq!(bbox.area(), 640.0 * 480.0);
        assert_eq!(bbox.confidence, 1.0);
    }

    #[test]
    fn test_no_landmarks_always_fails() {
        let frame = VideoFrame::blank(4, 4, 0);
        let bbox = FaceBbox::full_frame(&frame);
        assert!(matches!(
            NoLandmarks.predict(&frame, &bbox),
            Err(DmsError::Inference(_))
        ));
    }
}
