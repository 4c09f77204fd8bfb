// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for frame sources

use crate::errors::CaptureError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Result type for frame source operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Sensor mounting rotation
///
/// How far the sensor is turned relative to the display. The preview
/// rotates the picture clockwise by this amount so it appears upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u32", from = "u32")]
pub enum SensorRotation {
    /// No rotation (sensor is oriented correctly)
    #[default]
    None,
    /// 90 degrees clockwise
    Rotate90,
    /// 180 degrees (upside down)
    Rotate180,
    /// 270 degrees clockwise (90 degrees counter-clockwise)
    Rotate270,
}

impl SensorRotation {
    /// Create rotation from an integer degree value (normalised to 0-360).
    ///
    /// Values that are not a multiple of 90 map to no rotation.
    pub fn from_degrees_int(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => SensorRotation::Rotate90,
            180 => SensorRotation::Rotate180,
            270 => SensorRotation::Rotate270,
            _ => SensorRotation::None,
        }
    }

    /// Get the rotation in degrees
    pub fn degrees(&self) -> u32 {
        match self {
            SensorRotation::None => 0,
            SensorRotation::Rotate90 => 90,
            SensorRotation::Rotate180 => 180,
            SensorRotation::Rotate270 => 270,
        }
    }

    /// Check if rotation swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, SensorRotation::Rotate90 | SensorRotation::Rotate270)
    }
}

impl From<SensorRotation> for u32 {
    fn from(rotation: SensorRotation) -> Self {
        rotation.degrees()
    }
}

impl From<u32> for SensorRotation {
    fn from(degrees: u32) -> Self {
        SensorRotation::from_degrees_int((degrees % 360) as i32)
    }
}

impl std::fmt::Display for SensorRotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// One raw frame copied out of a source
///
/// Holds a single 8-bit luma plane. `row_stride` is the distance in bytes
/// between the starts of consecutive rows and may exceed `width`.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub row_stride: u32,
    pub data: Arc<[u8]>,
    pub captured_at: Instant,
}

impl RawFrame {
    /// Check dimensions against the buffer length
    pub fn validate(&self) -> CaptureResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(CaptureError::InvalidFrame("zero-sized frame".to_string()));
        }
        if self.row_stride < self.width {
            return Err(CaptureError::InvalidFrame(format!(
                "stride {} smaller than width {}",
                self.row_stride, self.width
            )));
        }
        let required = self.row_stride as usize * (self.height as usize - 1) + self.width as usize;
        if self.data.len() < required {
            return Err(CaptureError::InvalidFrame(format!(
                "{} bytes, need at least {}",
                self.data.len(),
                required
            )));
        }
        Ok(())
    }

    /// Luma row `y` without stride padding
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.row_stride as usize;
        &self.data[start..start + self.width as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(SensorRotation::from_degrees_int(-90), SensorRotation::Rotate270);
        assert_eq!(SensorRotation::from_degrees_int(450), SensorRotation::Rotate90);
        assert_eq!(SensorRotation::from_degrees_int(45), SensorRotation::None);
        assert!(SensorRotation::Rotate270.swaps_dimensions());
    }

    #[test]
    fn test_rotation_serializes_as_degrees() {
        assert_eq!(serde_json::to_string(&SensorRotation::Rotate180).unwrap(), "180");
        let rotation: SensorRotation = serde_json::from_str("270").unwrap();
        assert_eq!(rotation, SensorRotation::Rotate270);
    }

    #[test]
    fn test_raw_frame_validate_and_row() {
        let mut data = vec![0u8; 8 * 2];
        data[8..12].copy_from_slice(&[1, 2, 3, 4]);
        let frame = RawFrame {
            width: 4,
            height: 2,
            row_stride: 8,
            data: data.into(),
            captured_at: Instant::now(),
        };
        assert!(frame.validate().is_ok());
        assert_eq!(frame.row(1), &[1, 2, 3, 4]);

        let short = RawFrame {
            data: vec![0u8; 11].into(),
            ..frame
        };
        assert!(short.validate().is_err());
    }
}
