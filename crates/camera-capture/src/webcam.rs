//! Live capture from a local camera through OpenCV

use opencv::{core, imgproc, prelude::*, videoio};
use std::time::Instant;
use tracing::{debug, info};

use crate::{CameraError, FrameSource, VideoFrame};

fn capture_err(e: opencv::Error) -> CameraError {
    CameraError::Capture(e.to_string())
}

/// Frames from a camera device, converted from BGR to RGB
pub struct WebcamSource {
    capture: videoio::VideoCapture,
    index: i32,
    opened_at: Instant,
    sequence: u32,
}

impl WebcamSource {
    /// Open camera `index` (0 is the default device)
    pub fn open(index: i32) -> Result<Self, CameraError> {
        let capture = videoio::VideoCapture::new(index, videoio::CAP_ANY)
            .map_err(|e| CameraError::Open(format!("camera {}: {}", index, e)))?;

        if !capture.is_opened().map_err(capture_err)? {
            return Err(CameraError::Open(format!("camera {} is not available", index)));
        }

        info!("Opened camera {}", index);
        Ok(Self {
            capture,
            index,
            opened_at: Instant::now(),
            sequence: 0,
        })
    }
}

impl FrameSource for WebcamSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        let mut bgr = core::Mat::default();
        let grabbed = self.capture.read(&mut bgr).map_err(capture_err)?;
        if !grabbed || bgr.empty() {
            debug!("Camera {} returned no frame", self.index);
            return Ok(None);
        }

        let mut rgb = core::Mat::default();
        imgproc::cvt_color(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0).map_err(capture_err)?;

        let data = rgb.data_bytes().map_err(capture_err)?.to_vec();
        let frame = VideoFrame::new(
            data,
            rgb.cols() as u32,
            rgb.rows() as u32,
            self.opened_at.elapsed().as_nanos() as u64,
            self.sequence,
        );
        self.sequence = self.sequence.wrapping_add(1);
        Ok(Some(frame))
    }
}

impl Drop for WebcamSource {
    fn drop(&mut self) {
        if let Err(e) = self.capture.release() {
            debug!("Releasing camera {} failed: {}", self.index, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_device_is_open_error() {
        assert!(matches!(WebcamSource::open(9_999), Err(CameraError::Open(_))));
    }
}
