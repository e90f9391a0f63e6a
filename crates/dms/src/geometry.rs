//! Landmark geometry: eye and mouth aspect ratios from the 68-point face model

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::DmsError;

/// Number of points produced by the landmark predictor
pub const LANDMARK_COUNT: usize = 68;

const LEFT_EYE: std::ops::Range<usize> = 36..42;
const RIGHT_EYE: std::ops::Range<usize> = 42..48;
const MOUTH: std::ops::Range<usize> = 48..68;

/// Widths below this are treated as collapsed landmarks
const MIN_SPAN: f64 = f64::EPSILON;

/// A single facial landmark in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f64,
    pub y: f64,
}

impl LandmarkPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for LandmarkPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Six-point eye contour: corners at 0 and 3, upper lid 1-2, lower lid 4-5
pub type EyeShape = [LandmarkPoint; 6];

/// Twenty-point mouth contour: outer lip 0-11, inner lip 12-19
pub type MouthShape = [LandmarkPoint; 20];

/// Euclidean distance between two landmarks
pub fn distance(p1: &LandmarkPoint, p2: &LandmarkPoint) -> f64 {
    (p1.x - p2.x).hypot(p1.y - p2.y)
}

/// EAR = (|p1-p5| + |p2-p4|) / (2 * |p0-p3|)
pub fn eye_aspect_ratio(eye: &EyeShape) -> Result<f64, DmsError> {
    let width = distance(&eye[0], &eye[3]);
    if !(width > MIN_SPAN) {
        return Err(DmsError::DegenerateGeometry("eye corners coincide"));
    }
    finite_ratio(
        (distance(&eye[1], &eye[5]) + distance(&eye[2], &eye[4])) / (2.0 * width),
        "eye ratio is not finite",
    )
}

/// MAR over the inner lip: (|m13-m19| + |m14-m18|) / (2 * |m12-m16|)
pub fn mouth_aspect_ratio(mouth: &MouthShape) -> Result<f64, DmsError> {
    let width = distance(&mouth[12], &mouth[16]);
    if !(width > MIN_SPAN) {
        return Err(DmsError::DegenerateGeometry("mouth corners coincide"));
    }
    finite_ratio(
        (distance(&mouth[13], &mouth[19]) + distance(&mouth[14], &mouth[18])) / (2.0 * width),
        "mouth ratio is not finite",
    )
}

/// Huge or non-finite coordinates overflow the distances into inf/NaN
fn finite_ratio(ratio: f64, what: &'static str) -> Result<f64, DmsError> {
    if ratio.is_finite() {
        Ok(ratio)
    } else {
        Err(DmsError::DegenerateGeometry(what))
    }
}

/// Full landmark set for one face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LandmarkPoint>", into = "Vec<LandmarkPoint>")]
pub struct FaceLandmarks {
    points: Vec<LandmarkPoint>,
}

/// Ratios derived from one face; `None` where the geometry was degenerate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FaceRatios {
    /// Mean of both eyes
    pub ear: Option<f64>,
    pub mar: Option<f64>,
}

impl FaceLandmarks {
    pub fn from_points(points: Vec<LandmarkPoint>) -> Result<Self, DmsError> {
        if points.len() != LANDMARK_COUNT {
            return Err(DmsError::KeypointsMissing);
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[LandmarkPoint] {
        &self.points
    }

    pub fn left_eye(&self) -> EyeShape {
        self.shape(LEFT_EYE)
    }

    pub fn right_eye(&self) -> EyeShape {
        self.shape(RIGHT_EYE)
    }

    pub fn mouth(&self) -> MouthShape {
        self.shape(MOUTH)
    }

    /// Compute both ratios, dropping whichever one has degenerate geometry.
    pub fn ratios(&self) -> FaceRatios {
        let ear = match (
            eye_aspect_ratio(&self.left_eye()),
            eye_aspect_ratio(&self.right_eye()),
        ) {
            (Ok(left), Ok(right)) => Some((left + right) / 2.0),
            (Err(e), _) | (_, Err(e)) => {
                debug!("Skipping eye ratio: {}", e);
                None
            }
        };
        let mar = match mouth_aspect_ratio(&self.mouth()) {
            Ok(mar) => Some(mar),
            Err(e) => {
                debug!("Skipping mouth ratio: {}", e);
                None
            }
        };
        FaceRatios { ear, mar }
    }

    fn shape<const N: usize>(&self, range: std::ops::Range<usize>) -> [LandmarkPoint; N] {
        debug_assert_eq!(range.len(), N);
        std::array::from_fn(|i| self.points[range.start + i])
    }
}

impl TryFrom<Vec<LandmarkPoint>> for FaceLandmarks {
    type Error = DmsError;

    fn try_from(points: Vec<LandmarkPoint>) -> Result<Self, Self::Error> {
        Self::from_points(points)
    }
}

impl From<FaceLandmarks> for Vec<LandmarkPoint> {
    fn from(face: FaceLandmarks) -> Self {
        face.points
    }
}
