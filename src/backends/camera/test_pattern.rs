// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic animated source
//!
//! Stands in for a physical camera. Rows are padded so the stride never
//! equals the width, like real sensor buffers.

use super::types::{CaptureResult, RawFrame};
use super::{FramePacer, FrameSource};
use crate::constants::capture::TEST_PATTERN_ROW_PADDING;
use crate::preview::Orientation;
use std::sync::Arc;
use std::time::Instant;

/// Moving shapes on a gradient, different per facing
#[derive(Debug)]
pub struct TestPatternSource {
    width: u32,
    height: u32,
    row_stride: u32,
    facing: Orientation,
    frame_index: u64,
    pacer: FramePacer,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32, framerate: u32, facing: Orientation) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            row_stride: width.max(1) + TEST_PATTERN_ROW_PADDING,
            facing,
            frame_index: 0,
            pacer: FramePacer::new(framerate),
        }
    }

    /// Source that produces a frame on every call
    pub fn unpaced(width: u32, height: u32, facing: Orientation) -> Self {
        Self::new(width, height, 0, facing)
    }

    pub fn row_stride(&self) -> u32 {
        self.row_stride
    }

    fn render(&self) -> Vec<u8> {
        let (w, h) = (self.width as usize, self.height as usize);
        let stride = self.row_stride as usize;
        let mut data = vec![0u8; stride * h];

        let t = self.frame_index as usize;
        let bar_width = (w / 8).max(1);
        let bar_x = (t * 4) % w;
        let box_size = (h.min(w) / 4).max(1);
        let box_y = (t * 2) % h;

        for (y, row) in data.chunks_mut(stride).enumerate() {
            for (x, value) in row[..w].iter_mut().enumerate() {
                let background = match self.facing {
                    Orientation::Back => (x * 160 / w) as u8,
                    Orientation::Front => (((x + y) / 16) % 2 * 96) as u8,
                };
                let in_bar = x >= bar_x && x < bar_x + bar_width;
                let in_box = y >= box_y
                    && y < box_y + box_size
                    && x >= w / 8
                    && x < w / 8 + box_size;
                *value = if in_bar || in_box { 240 } else { background };
            }
            // Padding is never meant to be read
            for value in &mut row[w..] {
                *value = 0xAA;
            }
        }
        data
    }
}

impl FrameSource for TestPatternSource {
    fn next_frame(&mut self) -> CaptureResult<Option<RawFrame>> {
        if !self.pacer.ready() {
            return Ok(None);
        }

        let data = self.render();
        self.frame_index = self.frame_index.wrapping_add(1);

        Ok(Some(RawFrame {
            width: self.width,
            height: self.height,
            row_stride: self.row_stride,
            data: Arc::from(data.into_boxed_slice()),
            captured_at: Instant::now(),
        }))
    }

    fn name(&self) -> String {
        format!("test-pattern ({})", self.facing.display_name().to_lowercase())
    }
}
