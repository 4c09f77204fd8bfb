// SPDX-License-Identifier: GPL-3.0-only

//! Single-item mailbox between the producer and the render thread
//!
//! Publishing overwrites whatever is pending; consuming takes it. A slow
//! renderer therefore only ever sees the newest frame and never builds a
//! backlog.

use super::frame::Frame;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared texture slot
#[derive(Debug, Default)]
pub struct FrameSlot {
    pending: Mutex<Option<Frame>>,
    /// Frames overwritten before the renderer consumed them
    dropped: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `frame`, discarding any frame that was still pending
    ///
    /// Returns `true` when an older frame was discarded. The lock is held
    /// only for the swap; the discarded frame is freed after release.
    pub fn publish(&self, frame: Frame) -> bool {
        let previous = {
            let mut pending = self
                .pending
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            pending.replace(frame)
        };

        let replaced = previous.is_some();
        if replaced {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        replaced
    }

    /// Take the pending frame, if any
    ///
    /// Called from the render thread once per draw cycle. `None` means no
    /// frame was published since the last consume.
    pub fn consume(&self) -> Option<Frame> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    /// Whether a frame is waiting to be consumed
    pub fn is_available(&self) -> bool {
        self.pending
            .lock()
            .map(|pending| pending.is_some())
            .unwrap_or(false)
    }

    /// Discard the pending frame without rendering it
    pub fn clear(&self) {
        drop(self.consume());
    }

    /// Number of frames overwritten before being consumed
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
