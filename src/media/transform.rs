// SPDX-License-Identifier: GPL-3.0-only

//! Frame transform seam
//!
//! A transform turns one raw luma plane into a packed RGBA8 buffer of
//! exactly `width * height * 4` bytes. It runs synchronously on the
//! producer thread. Anything else it returns is treated as a dropped frame.

use crate::constants::render::BYTES_PER_PIXEL;
use crate::errors::TransformError;
use crate::preview::frame::rgba_len;

/// Raw frame → renderable RGBA8 pixels
pub trait FrameTransform: Send + Sync {
    /// Convert `input` (rows `row_stride` bytes apart) to packed RGBA8
    fn transform(
        &self,
        width: u32,
        height: u32,
        input: &[u8],
        row_stride: u32,
    ) -> Result<Vec<u8>, TransformError>;

    /// Short name for logs
    fn name(&self) -> &'static str {
        "custom"
    }
}

impl<F> FrameTransform for F
where
    F: Fn(u32, u32, &[u8], u32) -> Result<Vec<u8>, TransformError> + Send + Sync,
{
    fn transform(
        &self,
        width: u32,
        height: u32,
        input: &[u8],
        row_stride: u32,
    ) -> Result<Vec<u8>, TransformError> {
        self(width, height, input, row_stride)
    }
}

/// Check that an input plane is large enough for the given geometry
pub fn validate_input(
    width: u32,
    height: u32,
    input: &[u8],
    row_stride: u32,
) -> Result<(), TransformError> {
    if width == 0 || height == 0 {
        return Err(TransformError::EmptyFrame);
    }
    if row_stride < width {
        return Err(TransformError::InvalidStride { width, row_stride });
    }
    let expected = row_stride as usize * (height as usize - 1) + width as usize;
    if input.len() < expected {
        return Err(TransformError::InputTooShort {
            expected,
            actual: input.len(),
        });
    }
    Ok(())
}

/// Check a transform result before it is published
pub fn validate_output(width: u32, height: u32, output: &[u8]) -> Result<(), TransformError> {
    if width == 0 || height == 0 {
        return Err(TransformError::EmptyFrame);
    }
    let expected = rgba_len(width, height);
    if output.len() != expected {
        return Err(TransformError::OutputSizeMismatch {
            expected,
            actual: output.len(),
        });
    }
    Ok(())
}

/// Expand one luma value into an opaque gray RGBA pixel
#[inline]
pub(crate) fn gray_pixel(luma: u8) -> [u8; BYTES_PER_PIXEL as usize] {
    [luma, luma, luma, 255]
}

/// Luma rendered as opaque gray
#[derive(Debug, Clone, Copy, Default)]
pub struct GrayscaleTransform;

impl FrameTransform for GrayscaleTransform {
    fn transform(
        &self,
        width: u32,
        height: u32,
        input: &[u8],
        row_stride: u32,
    ) -> Result<Vec<u8>, TransformError> {
        validate_input(width, height, input, row_stride)?;

        let mut output = Vec::with_capacity(rgba_len(width, height));
        for row in input
            .chunks(row_stride as usize)
            .take(height as usize)
        {
            for &luma in &row[..width as usize] {
                output.extend_from_slice(&gray_pixel(luma));
            }
        }
        Ok(output)
    }

    fn name(&self) -> &'static str {
        "grayscale"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grayscale_skips_stride_padding() {
        // 2x2 plane with 2 bytes of padding per row
        let input = [10, 20, 99, 99, 30, 40];
        let output = GrayscaleTransform.transform(2, 2, &input, 4).unwrap();
        assert_eq!(output.len(), 16);
        assert_eq!(&output[0..4], &[10, 10, 10, 255]);
        assert_eq!(&output[12..16], &[40, 40, 40, 255]);
    }

    #[test]
    fn test_closure_transform() {
        let transform =
            |w: u32, h: u32, _: &[u8], _: u32| Ok::<_, TransformError>(vec![0u8; rgba_len(w, h)]);
        let output = transform.transform(3, 3, &[0; 9], 3).unwrap();
        assert_eq!(output.len(), 36);
        assert_eq!(FrameTransform::name(&transform), "custom");
    }

    #[test]
    fn test_validate_input() {
        assert_eq!(
            validate_input(4, 2, &[0; 8], 2),
            Err(TransformError::InvalidStride {
                width: 4,
                row_stride: 2
            })
        );
        assert_eq!(
            validate_input(4, 2, &[0; 7], 4),
            Err(TransformError::InputTooShort {
                expected: 8,
                actual: 7
            })
        );
        assert!(validate_input(4, 2, &[0; 8], 4).is_ok());
    }

    #[test]
    fn test_validate_output() {
        assert!(validate_output(2, 2, &[0; 16]).is_ok());
        assert!(validate_output(2, 2, &[0; 12]).is_err());
        assert_eq!(validate_output(0, 2, &[]), Err(TransformError::EmptyFrame));
    }
}
