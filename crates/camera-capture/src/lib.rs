//! Camera Capture Library for the study monitor
//!
//! Provides the frame plumbing the monitor consumes each tick:
//! - Decoded RGB video frames
//! - The `FrameSource` seam between the host loop and a camera
//! - Image-sequence replay of recorded frames
//! - Live webcam capture (`webcam` feature)

pub mod frame;
pub mod source;
#[cfg(feature = "webcam")]
pub mod webcam;

pub use frame::VideoFrame;
pub use source::{BlankSource, FrameSource, ImageSequenceSource};
#[cfg(feature = "webcam")]
pub use webcam::WebcamSource;

use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Failed to decode frame {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[cfg(feature = "webcam")]
    #[error("Capture error: {0}")]
    Capture(String),
}
