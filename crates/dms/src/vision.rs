//! OpenCV face models for live frames
//!
//! A Haar cascade finds faces on the luma plane and an LBF facemark model
//! places the 68 landmarks inside each box.

use camera_capture::VideoFrame;
use opencv::{core, face, objdetect, prelude::*};
use std::path::Path;
use tracing::info;

use crate::detector::{FaceBbox, FaceDetector, LandmarkPredictor};
use crate::geometry::{FaceLandmarks, LandmarkPoint};
use crate::DmsError;

/// Stock frontal-face cascade shipped with OpenCV on Linux
pub const DEFAULT_FACE_CASCADE: &str =
    "/usr/share/opencv4/haarcascades/haarcascade_frontalface_default.xml";

fn cv_err(e: opencv::Error) -> DmsError {
    DmsError::Inference(e.to_string())
}

fn path_str(path: &Path) -> Result<&str, DmsError> {
    path.to_str()
        .ok_or_else(|| DmsError::Config(format!("path is not UTF-8: {}", path.display())))
}

/// Single-channel Mat over the frame's luma plane
fn gray_mat(frame: &VideoFrame) -> Result<core::Mat, DmsError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(DmsError::Inference("empty frame".into()));
    }
    let gray = frame.to_grayscale();
    let flat = core::Mat::from_slice(&gray).map_err(cv_err)?;
    let shaped = flat.reshape(1, frame.height as i32).map_err(cv_err)?;
    shaped.try_clone().map_err(cv_err)
}

fn rect_to_bbox(rect: core::Rect) -> FaceBbox {
    FaceBbox {
        x: rect.x as f32,
        y: rect.y as f32,
        width: rect.width as f32,
        height: rect.height as f32,
        confidence: 1.0,
    }
}

fn bbox_to_rect(bbox: &FaceBbox) -> core::Rect {
    core::Rect::new(
        bbox.x.round() as i32,
        bbox.y.round() as i32,
        bbox.width.round() as i32,
        bbox.height.round() as i32,
    )
}

/// Haar cascade face detector
pub struct CascadeFaceDetector {
    classifier: objdetect::CascadeClassifier,
    scale_factor: f64,
    min_neighbors: i32,
    min_size: i32,
}

impl CascadeFaceDetector {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DmsError> {
        let path = path.as_ref();
        let classifier = objdetect::CascadeClassifier::new(path_str(path)?).map_err(cv_err)?;
        if classifier.empty().map_err(cv_err)? {
            return Err(DmsError::Config(format!(
                "could not load face cascade {}",
                path.display()
            )));
        }
        info!("Loaded face cascade from {}", path.display());
        Ok(Self {
            classifier,
            scale_factor: 1.1,
            min_neighbors: 5,
            min_size: 30,
        })
    }
}

impl FaceDetector for CascadeFaceDetector {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<FaceBbox>, DmsError> {
        let gray = gray_mat(frame)?;
        let mut faces = core::Vector::<core::Rect>::new();
        self.classifier
            .detect_multi_scale(
                &gray,
                &mut faces,
                self.scale_factor,
                self.min_neighbors,
                0,
                core::Size::new(self.min_size, self.min_size),
                core::Size::new(0, 0),
            )
            .map_err(cv_err)?;
        Ok(faces.iter().map(rect_to_bbox).collect())
    }
}

/// LBF facemark model producing the 68-point layout
pub struct FacemarkPredictor {
    model: core::Ptr<face::Facemark>,
}

impl FacemarkPredictor {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DmsError> {
        let path = path.as_ref();
        let mut model = face::create_facemark_lbf().map_err(cv_err)?;
        model.load_model(path_str(path)?).map_err(|e| {
            DmsError::Config(format!("could not load landmark model {}: {}", path.display(), e))
        })?;
        info!("Loaded landmark model from {}", path.display());
        Ok(Self { model })
    }
}

impl LandmarkPredictor for FacemarkPredictor {
    fn predict(&mut self, frame: &VideoFrame, face: &FaceBbox) -> Result<FaceLandmarks, DmsError> {
        let gray = gray_mat(frame)?;
        let faces = core::Vector::<core::Rect>::from_iter([bbox_to_rect(face)]);
        let mut fitted = core::Vector::<core::Vector<core::Point2f>>::new();

        if !self.model.fit(&gray, &faces, &mut fitted).map_err(cv_err)? {
            return Err(DmsError::Inference("landmark fit failed".into()));
        }
        let points = fitted.get(0).map_err(cv_err)?;
        FaceLandmarks::from_points(
            points
                .iter()
                .map(|p| LandmarkPoint::new(p.x as f64, p.y as f64))
                .collect(),
        )
    }
}
