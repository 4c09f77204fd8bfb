// SPDX-License-Identifier: GPL-3.0-only

//! Renderable frame produced by a transform and handed to the renderer

use crate::constants::render::BYTES_PER_PIXEL;
use crate::errors::TransformError;
use crate::media::validate_output;

/// Packed RGBA8 frame ready for texture upload
///
/// Always holds exactly `width * height * 4` bytes with no row padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    /// Wrap a transform result, rejecting buffers of the wrong length
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, TransformError> {
        validate_output(width, height, &pixels)?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Frame where every byte has the same value
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            pixels: vec![value; rgba_len(width, height)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Packed RGBA8 bytes, top row first
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Bytes per row as uploaded to the texture
    pub fn bytes_per_row(&self) -> u32 {
        self.width * BYTES_PER_PIXEL
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

/// Byte length of a packed RGBA8 buffer
pub fn rgba_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_length() {
        let err = Frame::new(2, 2, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            TransformError::OutputSizeMismatch {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(Frame::new(0, 4, vec![]), Err(TransformError::EmptyFrame));
    }

    #[test]
    fn test_filled() {
        let frame = Frame::filled(4, 4, 0xFF);
        assert_eq!(frame.pixels().len(), 64);
        assert_eq!(frame.bytes_per_row(), 16);
        assert!(frame.pixels().iter().all(|&b| b == 0xFF));
    }
}
