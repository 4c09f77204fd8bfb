// SPDX-License-Identifier: GPL-3.0-only

//! Edge map transform
//!
//! Sobel gradients, non-maximum suppression along the gradient direction,
//! then double thresholding with hysteresis. Edges come out white on an
//! opaque black background.

use super::transform::{FrameTransform, validate_input};
use crate::constants::edge::{DEFAULT_HIGH_THRESHOLD, DEFAULT_LOW_THRESHOLD};
use crate::errors::TransformError;
use crate::preview::frame::rgba_len;

const EDGE_PIXEL: [u8; 4] = [255, 255, 255, 255];
const BACKGROUND_PIXEL: [u8; 4] = [0, 0, 0, 255];

/// tan(22.5°) scaled by 1000 for integer direction binning
const TAN_22_5_X1000: i32 = 414;

/// Gradient direction, quantised to the neighbour pair it is compared with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Horizontal,
    Vertical,
    /// Down-right / up-left
    Diagonal,
    /// Down-left / up-right
    AntiDiagonal,
}

/// Double-threshold edge detector over a luma plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeDetector {
    low: u16,
    high: u16,
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_LOW_THRESHOLD, DEFAULT_HIGH_THRESHOLD)
    }
}

impl EdgeDetector {
    /// Thresholds apply to the L1 gradient magnitude; they are reordered if
    /// given high-first
    pub fn new(low: u16, high: u16) -> Self {
        Self {
            low: low.min(high),
            high: low.max(high),
        }
    }

    pub fn thresholds(&self) -> (u16, u16) {
        (self.low, self.high)
    }

    /// Edge mask, one entry per pixel, row-major
    pub fn detect(
        &self,
        width: u32,
        height: u32,
        input: &[u8],
        row_stride: u32,
    ) -> Result<Vec<bool>, TransformError> {
        validate_input(width, height, input, row_stride)?;

        let (w, h) = (width as usize, height as usize);
        let (magnitude, direction) = sobel(w, h, input, row_stride as usize);
        let thinned = suppress_non_maxima(w, h, &magnitude, &direction);
        Ok(hysteresis(w, h, &thinned, self.low.into(), self.high.into()))
    }
}

impl FrameTransform for EdgeDetector {
    fn transform(
        &self,
        width: u32,
        height: u32,
        input: &[u8],
        row_stride: u32,
    ) -> Result<Vec<u8>, TransformError> {
        let mask = self.detect(width, height, input, row_stride)?;

        let mut output = Vec::with_capacity(rgba_len(width, height));
        for is_edge in mask {
            output.extend_from_slice(if is_edge { &EDGE_PIXEL } else { &BACKGROUND_PIXEL });
        }
        Ok(output)
    }

    fn name(&self) -> &'static str {
        "edge"
    }
}

/// L1 Sobel magnitude and quantised direction, clamping at the borders
fn sobel(w: usize, h: usize, input: &[u8], stride: usize) -> (Vec<i32>, Vec<Direction>) {
    let pixel = |x: isize, y: isize| -> i32 {
        let x = x.clamp(0, w as isize - 1) as usize;
        let y = y.clamp(0, h as isize - 1) as usize;
        i32::from(input[y * stride + x])
    };

    let mut magnitude = vec![0i32; w * h];
    let mut direction = vec![Direction::Horizontal; w * h];

    for y in 0..h as isize {
        for x in 0..w as isize {
            let gx = pixel(x + 1, y - 1) + 2 * pixel(x + 1, y) + pixel(x + 1, y + 1)
                - pixel(x - 1, y - 1)
                - 2 * pixel(x - 1, y)
                - pixel(x - 1, y + 1);
            let gy = pixel(x - 1, y + 1) + 2 * pixel(x, y + 1) + pixel(x + 1, y + 1)
                - pixel(x - 1, y - 1)
                - 2 * pixel(x, y - 1)
                - pixel(x + 1, y - 1);

            let index = y as usize * w + x as usize;
            magnitude[index] = gx.abs() + gy.abs();
            direction[index] = quantise(gx, gy);
        }
    }

    (magnitude, direction)
}

fn quantise(gx: i32, gy: i32) -> Direction {
    let (ax, ay) = (gx.abs(), gy.abs());
    if ay * 1000 <= ax * TAN_22_5_X1000 {
        Direction::Horizontal
    } else if ay * TAN_22_5_X1000 >= ax * 1000 {
        Direction::Vertical
    } else if (gx >= 0) == (gy >= 0) {
        Direction::Diagonal
    } else {
        Direction::AntiDiagonal
    }
}

/// Keep only magnitudes that peak across the edge
fn suppress_non_maxima(w: usize, h: usize, magnitude: &[i32], direction: &[Direction]) -> Vec<i32> {
    let at = |x: isize, y: isize| -> i32 {
        if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
            0
        } else {
            magnitude[y as usize * w + x as usize]
        }
    };

    let mut thinned = vec![0i32; w * h];
    for y in 0..h as isize {
        for x in 0..w as isize {
            let index = y as usize * w + x as usize;
            let m = magnitude[index];
            if m == 0 {
                continue;
            }
            let ((ax, ay), (bx, by)) = match direction[index] {
                Direction::Horizontal => ((x - 1, y), (x + 1, y)),
                Direction::Vertical => ((x, y - 1), (x, y + 1)),
                Direction::Diagonal => ((x - 1, y - 1), (x + 1, y + 1)),
                Direction::AntiDiagonal => ((x + 1, y - 1), (x - 1, y + 1)),
            };
            // Strict on one side so plateaus two pixels wide keep exactly one
            if m > at(ax, ay) && m >= at(bx, by) {
                thinned[index] = m;
            }
        }
    }
    thinned
}

/// Strong pixels seed edges; weak pixels survive only if 8-connected to one
fn hysteresis(w: usize, h: usize, magnitude: &[i32], low: i32, high: i32) -> Vec<bool> {
    let mut edges = vec![false; w * h];
    let mut stack: Vec<usize> = Vec::new();

    for (index, &m) in magnitude.iter().enumerate() {
        if m > high {
            edges[index] = true;
            stack.push(index);
        }
    }

    while let Some(index) = stack.pop() {
        let (x, y) = ((index % w) as isize, (index / w) as isize);
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                    continue;
                }
                let neighbour = ny as usize * w + nx as usize;
                if !edges[neighbour] && magnitude[neighbour] > low {
                    edges[neighbour] = true;
                    stack.push(neighbour);
                }
            }
        }
    }

    edges
}
