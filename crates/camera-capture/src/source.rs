//! Frame sources polled by the host loop

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::{CameraError, VideoFrame};

/// Extensions accepted by [`ImageSequenceSource`]
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "ppm"];

/// Anything that can hand the host one frame per tick.
///
/// `Ok(None)` means no frame is available right now; the host skips the tick
/// and polls again. Errors are per-tick too and never end the session.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;

    /// A finite source returns true once every frame has been handed out.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Replays a directory of still images as a video stream, in file-name order.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    cursor: usize,
    frame_interval_ns: u64,
}

impl ImageSequenceSource {
    /// Index every image file in `dir`
    pub fn open(dir: impl AsRef<Path>, fps: u32) -> Result<Self, CameraError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir)
            .map_err(|e| CameraError::Open(format!("{}: {}", dir.display(), e)))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| CameraError::Open(format!("{}: {}", dir.display(), e)))?
                .path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image {
                paths.push(path);
            }
        }

        if paths.is_empty() {
            return Err(CameraError::Open(format!("no image frames in {}", dir.display())));
        }
        paths.sort();

        info!("Replaying {} frames from {}", paths.len(), dir.display());
        Ok(Self {
            paths,
            cursor: 0,
            frame_interval_ns: 1_000_000_000 / fps.max(1) as u64,
        })
    }

    /// Number of frames in the sequence
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        let Some(path) = self.paths.get(self.cursor) else {
            return Ok(None);
        };
        let sequence = self.cursor as u32;
        self.cursor += 1;

        let img = image::open(path).map_err(|source| CameraError::Decode {
            path: path.display().to_string(),
            source,
        })?;
        debug!("Decoded frame {} from {}", sequence, path.display());

        Ok(Some(VideoFrame::from_rgb_image(
            img.to_rgb8(),
            sequence as u64 * self.frame_interval_ns,
            sequence,
        )))
    }

    fn is_exhausted(&self) -> bool {
        self.cursor >= self.paths.len()
    }
}

/// Emits blank frames, for runs where landmarks come from a recording and
/// pixels are irrelevant.
pub struct BlankSource {
    width: u32,
    height: u32,
    limit: Option<u32>,
    sequence: u32,
}

impl BlankSource {
    pub fn new(width: u32, height: u32, limit: Option<u32>) -> Self {
        Self {
            width,
            height,
            limit,
            sequence: 0,
        }
    }
}

impl FrameSource for BlankSource {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if self.is_exhausted() {
            return Ok(None);
        }
        let frame = VideoFrame::blank(self.width, self.height, self.sequence);
        self.sequence += 1;
        Ok(Some(frame))
    }

    fn is_exhausted(&self) -> bool {
        self.limit.map_or(false, |limit| self.sequence >= limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_image_sequence_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(2, 2, Rgb([200, 0, 0]))
            .save(dir.path().join("frame_001.png"))
            .unwrap();
        RgbImage::from_pixel(2, 2, Rgb([0, 200, 0]))
            .save(dir.path().join("frame_000.png"))
            .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let mut source = ImageSequenceSource::open(dir.path(), 10).unwrap();
        assert_eq!(source.len(), 2);

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!(first.sequence, 0);
        assert_eq!(first.get_pixel(0, 0), Some([0, 200, 0]));

        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.timestamp_ns, 100_000_000);
        assert_eq!(second.get_pixel(0, 0), Some([200, 0, 0]));

        assert!(source.is_exhausted());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ImageSequenceSource::open(dir.path(), 30),
            Err(CameraError::Open(_))
        ));
    }

    #[test]
    fn test_corrupt_frame_is_per_tick_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"garbage").unwrap();
        RgbImage::new(1, 1).save(dir.path().join("b.png")).unwrap();

        let mut source = ImageSequenceSource::open(dir.path(), 30).unwrap();
        assert!(matches!(source.next_frame(), Err(CameraError::Decode { .. })));
        // The source moves past the bad file
        assert!(source.next_frame().unwrap().is_some());
    }

    #[test]
    fn test_blank_source_limit() {
        let mut source = BlankSource::new(4, 4, Some(2));
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.is_exhausted());
        assert!(source.next_frame().unwrap().is_none());

        let mut endless = BlankSource::new(1, 1, None);
        for _ in 0..100 {
            assert!(endless.next_frame().unwrap().is_some());
        }
        assert!(!endless.is_exhausted());
    }
}
