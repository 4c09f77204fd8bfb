// SPDX-License-Identifier: GPL-3.0-only

//! One-shot snapshot requests
//!
//! At most one request is live. A newer request replaces an unfulfilled one;
//! the replaced callback is dropped without being called and a replaced
//! channel resolves as [`SnapshotError::Cancelled`]. Requests are fulfilled
//! on the render thread, never on the requesting thread.

use crate::errors::SnapshotError;
use futures::channel::oneshot;
use image::RgbaImage;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};
use tracing::debug;

/// Callback invoked on the render thread with the captured image
pub type SnapshotCallback = Box<dyn FnOnce(RgbaImage) + Send + 'static>;

/// A live snapshot request
pub enum PendingSnapshot {
    /// Closure supplied by the caller
    Callback(SnapshotCallback),
    /// Sending half of a [`SnapshotReceiver`]
    Channel(oneshot::Sender<Result<RgbaImage, SnapshotError>>),
}

impl PendingSnapshot {
    /// Deliver the captured image
    pub fn fulfil(self, image: RgbaImage) {
        match self {
            PendingSnapshot::Callback(callback) => callback(image),
            PendingSnapshot::Channel(sender) => {
                // Receiver may already be gone; nothing to deliver to then
                let _ = sender.send(Ok(image));
            }
        }
    }

    /// Report that the request could not be serviced
    ///
    /// Callbacks are dropped uninvoked; channels receive the error.
    pub fn fail(self, error: SnapshotError) {
        match self {
            PendingSnapshot::Callback(_) => {
                debug!(%error, "Dropping snapshot callback after failure");
            }
            PendingSnapshot::Channel(sender) => {
                let _ = sender.send(Err(error));
            }
        }
    }
}

impl std::fmt::Debug for PendingSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PendingSnapshot::Callback(_) => f.write_str("PendingSnapshot::Callback"),
            PendingSnapshot::Channel(_) => f.write_str("PendingSnapshot::Channel"),
        }
    }
}

/// Receiving end of an asynchronous snapshot request
///
/// Resolves once the render thread has serviced the request, or with
/// [`SnapshotError::Cancelled`] if a later request replaced it or the
/// session shut down first.
#[derive(Debug)]
pub struct SnapshotReceiver {
    receiver: oneshot::Receiver<Result<RgbaImage, SnapshotError>>,
}

impl SnapshotReceiver {
    /// Non-blocking check; `None` while the request is still pending
    pub fn try_recv(&mut self) -> Option<Result<RgbaImage, SnapshotError>> {
        match self.receiver.try_recv() {
            Ok(Some(result)) => Some(result),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(Err(SnapshotError::Cancelled)),
        }
    }

    /// Block the current thread until the request resolves
    pub fn wait(self) -> Result<RgbaImage, SnapshotError> {
        futures::executor::block_on(self)
    }
}

impl Future for SnapshotReceiver {
    type Output = Result<RgbaImage, SnapshotError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(SnapshotError::Cancelled)))
    }
}

/// Create a linked request/receiver pair
pub fn snapshot_channel() -> (PendingSnapshot, SnapshotReceiver) {
    let (sender, receiver) = oneshot::channel();
    (
        PendingSnapshot::Channel(sender),
        SnapshotReceiver { receiver },
    )
}

/// Last-request-wins holder for the live snapshot request
#[derive(Debug, Default)]
pub struct SnapshotMailbox {
    pending: Mutex<Option<PendingSnapshot>>,
}

impl SnapshotMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `request`, returning `true` if an unfulfilled one was replaced
    pub fn request(&self, request: PendingSnapshot) -> bool {
        let previous = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(request);

        // Dropped outside the lock so a cancelled receiver wakes without contention
        let replaced = previous.is_some();
        if replaced {
            debug!("Replaced unfulfilled snapshot request");
        }
        replaced
    }

    /// Take the live request for servicing
    pub fn take(&self) -> Option<PendingSnapshot> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .map(|pending| pending.is_some())
            .unwrap_or(false)
    }

    /// Drop the live request, cancelling any waiting receiver
    pub fn cancel(&self) {
        drop(self.take());
    }
}

/// Row order of a read-back buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    /// First row in memory is the top of the image
    TopDown,
    /// First row in memory is the bottom of the image
    BottomUp,
}

/// Build a top-down RGBA image from a read-back buffer
///
/// `padded_bytes_per_row` may exceed `width * 4` when the GPU requires row
/// alignment. When `bgra` is set the red and blue channels are swapped.
/// Returns `None` if the buffer is too short for the given dimensions.
pub fn assemble_image(
    data: &[u8],
    width: u32,
    height: u32,
    padded_bytes_per_row: u32,
    order: RowOrder,
    bgra: bool,
) -> Option<RgbaImage> {
    let row_bytes = width as usize * 4;
    let stride = padded_bytes_per_row as usize;
    if width == 0 || height == 0 || stride < row_bytes {
        return None;
    }
    let required = stride * (height as usize - 1) + row_bytes;
    if data.len() < required {
        return None;
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let source_row = match order {
            RowOrder::TopDown => row,
            RowOrder::BottomUp => height as usize - 1 - row,
        };
        let start = source_row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }

    if bgra {
        for pixel in pixels.chunks_exact_mut(4) {
            pixel.swap(0, 2);
        }
    }

    RgbaImage::from_raw(width, height, pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_callback(counter: &Arc<AtomicUsize>) -> PendingSnapshot {
        let counter = Arc::clone(counter);
        PendingSnapshot::Callback(Box::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn test_last_request_wins() {
        let mailbox = SnapshotMailbox::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        assert!(!mailbox.request(counting_callback(&first)));
        assert!(mailbox.request(counting_callback(&second)));

        mailbox.take().unwrap().fulfil(RgbaImage::new(1, 1));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert!(mailbox.take().is_none());
    }

    #[test]
    fn test_replaced_receiver_is_cancelled() {
        let mailbox = SnapshotMailbox::new();
        let (request, mut receiver) = snapshot_channel();
        mailbox.request(request);
        let (newer, _newer_receiver) = snapshot_channel();
        mailbox.request(newer);

        assert!(matches!(
            receiver.try_recv(),
            Some(Err(SnapshotError::Cancelled))
        ));
    }

    #[test]
    fn test_taken_request_leaves_mailbox_empty() {
        let mailbox = SnapshotMailbox::new();
        let (request, receiver) = snapshot_channel();
        mailbox.request(request);

        mailbox.take().unwrap().fail(SnapshotError::NothingDrawn);
        assert!(!mailbox.is_pending());
        assert_eq!(receiver.wait().unwrap_err(), SnapshotError::NothingDrawn);
    }

    #[test]
    fn test_receiver_gets_image() {
        let (request, receiver) = snapshot_channel();
        request.fulfil(RgbaImage::new(3, 2));
        let image = receiver.wait().unwrap();
        assert_eq!(image.dimensions(), (3, 2));
    }

    #[test]
    fn test_failed_channel_reports_error() {
        let (request, receiver) = snapshot_channel();
        request.fail(SnapshotError::ReadbackFailed("lost".into()));
        assert_eq!(
            receiver.wait().unwrap_err(),
            SnapshotError::ReadbackFailed("lost".into())
        );
    }

    #[test]
    fn test_assemble_flips_bottom_up_rows() {
        // 1x2 image: bottom row red, top row blue, stored bottom-up
        let data = [255, 0, 0, 255, 0, 0, 255, 255];
        let image = assemble_image(&data, 1, 2, 4, RowOrder::BottomUp, false).unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(image.get_pixel(0, 1).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_assemble_strips_padding_and_swizzles() {
        let mut data = vec![0u8; 16];
        data[0..4].copy_from_slice(&[1, 2, 3, 4]);
        data[8..12].copy_from_slice(&[5, 6, 7, 8]);
        let image = assemble_image(&data, 1, 2, 8, RowOrder::TopDown, true).unwrap();
        assert_eq!(image.get_pixel(0, 0).0, [3, 2, 1, 4]);
        assert_eq!(image.get_pixel(0, 1).0, [7, 6, 5, 8]);
    }

    #[test]
    fn test_assemble_rejects_short_buffer() {
        assert!(assemble_image(&[0; 7], 1, 2, 4, RowOrder::TopDown, false).is_none());
        assert!(assemble_image(&[], 0, 0, 0, RowOrder::TopDown, false).is_none());
    }
}
