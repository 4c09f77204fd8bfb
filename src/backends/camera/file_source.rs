// SPDX-License-Identifier: GPL-3.0-only

//! Still image source
//!
//! Loads an image file once and re-emits its luma plane at the configured
//! frame rate, so a preview can run without a camera.

use super::types::{CaptureResult, RawFrame};
use super::{FramePacer, FrameSource};
use crate::constants::file_formats;
use crate::errors::CaptureError;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Replays one still image as a frame stream
#[derive(Debug)]
pub struct ImageFileSource {
    path: Option<PathBuf>,
    width: u32,
    height: u32,
    luma: Arc<[u8]>,
    pacer: FramePacer,
}

impl ImageFileSource {
    /// Load `path` and stream it at `framerate`
    pub fn open(path: &Path, framerate: u32) -> CaptureResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if !file_formats::is_image_extension(&extension) {
            return Err(CaptureError::InvalidFrame(format!(
                "Unsupported file format: {}",
                extension
            )));
        }

        if !path.exists() {
            return Err(CaptureError::DeviceNotFound(path.display().to_string()));
        }

        info!(path = %path.display(), "Loading image file");
        let image = image::open(path).map_err(|e| {
            CaptureError::InvalidFrame(format!("Failed to load image '{}': {}", path.display(), e))
        })?;

        let mut source = Self::from_image(&image, framerate)?;
        source.path = Some(path.to_path_buf());
        Ok(source)
    }

    /// Stream an already decoded image
    pub fn from_image(image: &DynamicImage, framerate: u32) -> CaptureResult<Self> {
        let luma = image.to_luma8();
        let (width, height) = luma.dimensions();
        if width == 0 || height == 0 {
            return Err(CaptureError::InvalidFrame("image has no pixels".to_string()));
        }

        info!(width, height, "Image source ready");
        Ok(Self {
            path: None,
            width,
            height,
            luma: Arc::from(luma.into_raw().into_boxed_slice()),
            pacer: FramePacer::new(framerate),
        })
    }
}

impl FrameSource for ImageFileSource {
    fn next_frame(&mut self) -> CaptureResult<Option<RawFrame>> {
        if !self.pacer.ready() {
            return Ok(None);
        }

        // Shared buffer, no per-frame copy
        Ok(Some(RawFrame {
            width: self.width,
            height: self.height,
            row_stride: self.width,
            data: Arc::clone(&self.luma),
            captured_at: Instant::now(),
        }))
    }

    fn name(&self) -> String {
        match &self.path {
            Some(path) => format!("image ({})", path.display()),
            None => "image".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    #[test]
    fn test_from_image_emits_luma() {
        let mut gray = GrayImage::new(3, 2);
        gray.put_pixel(2, 1, Luma([77]));
        let mut source = ImageFileSource::from_image(&DynamicImage::ImageLuma8(gray), 0).unwrap();

        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!((frame.width, frame.height, frame.row_stride), (3, 2, 3));
        assert_eq!(frame.row(1), &[0, 0, 77]);
    }

    #[test]
    fn test_open_rejects_unknown_extension() {
        let err = ImageFileSource::open(Path::new("clip.mp4"), 30).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidFrame(_)));
    }

    #[test]
    fn test_open_missing_file() {
        let err = ImageFileSource::open(Path::new("/nonexistent/frame.png"), 30).unwrap_err();
        assert!(matches!(err, CaptureError::DeviceNotFound(_)));
    }

    #[test]
    fn test_open_round_trips_through_disk() {
        let path = std::env::temp_dir().join(format!("edgecam-source-{}.png", std::process::id()));
        GrayImage::from_pixel(4, 4, Luma([200])).save(&path).unwrap();

        let mut source = ImageFileSource::open(&path, 0).unwrap();
        let frame = source.next_frame().unwrap().unwrap();
        assert!(frame.data.iter().all(|&v| v == 200));

        let _ = std::fs::remove_file(&path);
    }
}
