// SPDX-License-Identifier: GPL-3.0-only

//! Preview session: the explicit owner of everything shared between the
//! producer and the render thread
//!
//! [`SessionHandle`] is the cross-thread view. It carries the frame slot,
//! orientation flag, snapshot request and redraw signal, and never exposes
//! a GPU object. [`PreviewSession`] additionally owns the producer and the
//! render thread and tears them down in the right order.

use super::frame::Frame;
use super::orientation::{Orientation, OrientationControl};
use super::signal::RedrawSignal;
use super::slot::FrameSlot;
use super::snapshot::{
    PendingSnapshot, SnapshotMailbox, SnapshotReceiver, snapshot_channel,
};
use crate::backends::camera::{CaptureController, SourceFactory};
use crate::config::Config;
use crate::errors::{AppResult, CaptureError};
use crate::gpu::GpuDeviceInfo;
use crate::media;
use crate::render::{RenderHost, RenderOptions};
use image::RgbaImage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

#[derive(Debug)]
struct SessionShared {
    slot: FrameSlot,
    orientation: OrientationControl,
    snapshots: SnapshotMailbox,
    signal: RedrawSignal,
    fps: Mutex<Option<f64>>,
    frames_published: AtomicU64,
}

/// Clonable handle to a session's shared state
#[derive(Debug, Clone)]
pub struct SessionHandle {
    shared: Arc<SessionShared>,
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new(Orientation::default())
    }
}

impl SessionHandle {
    pub fn new(initial: Orientation) -> Self {
        Self {
            shared: Arc::new(SessionShared {
                slot: FrameSlot::new(),
                orientation: OrientationControl::new(initial),
                snapshots: SnapshotMailbox::new(),
                signal: RedrawSignal::new(),
                fps: Mutex::new(None),
                frames_published: AtomicU64::new(0),
            }),
        }
    }

    // ===== Frames =====

    /// Hand a frame to the renderer, replacing any unconsumed one
    ///
    /// Does not wake the renderer; follow with [`request_render`](Self::request_render).
    pub fn publish(&self, frame: Frame) {
        if self.shared.slot.publish(frame) {
            debug!("Unconsumed frame replaced");
        }
        self.shared.frames_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Take the newest unconsumed frame (render thread)
    pub fn consume(&self) -> Option<Frame> {
        self.shared.slot.consume()
    }

    pub fn frames_published(&self) -> u64 {
        self.shared.frames_published.load(Ordering::Relaxed)
    }

    /// Frames replaced in the slot before the renderer saw them
    pub fn frames_dropped(&self) -> u64 {
        self.shared.slot.dropped_count()
    }

    // ===== Redraw =====

    pub fn request_render(&self) {
        self.shared.signal.request();
    }

    pub fn signal(&self) -> &RedrawSignal {
        &self.shared.signal
    }

    // ===== Orientation =====

    pub fn orientation(&self) -> Orientation {
        self.shared.orientation.get()
    }

    /// Select the texture mapping used from the next draw onwards
    pub fn set_orientation(&self, orientation: Orientation) {
        self.shared.orientation.set(orientation);
        self.request_render();
    }

    // ===== Snapshots =====

    /// Capture the next rendered frame and pass it to `callback`
    ///
    /// The callback runs on the render thread. A later request made before
    /// this one is serviced replaces it and `callback` is never called.
    pub fn request_snapshot<F>(&self, callback: F)
    where
        F: FnOnce(RgbaImage) + Send + 'static,
    {
        self.shared
            .snapshots
            .request(PendingSnapshot::Callback(Box::new(callback)));
        self.request_render();
    }

    /// Capture the next rendered frame through a future
    pub fn request_snapshot_async(&self) -> SnapshotReceiver {
        let (request, receiver) = snapshot_channel();
        self.shared.snapshots.request(request);
        self.request_render();
        receiver
    }

    /// Take the live snapshot request (render thread)
    pub fn take_snapshot_request(&self) -> Option<PendingSnapshot> {
        self.shared.snapshots.take()
    }

    pub fn snapshot_pending(&self) -> bool {
        self.shared.snapshots.is_pending()
    }

    // ===== Statistics =====

    pub fn record_fps(&self, rate: f64) {
        *self
            .shared
            .fps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(rate);
    }

    /// Most recent producer frame rate
    pub fn fps(&self) -> Option<f64> {
        self.shared.fps.lock().ok().and_then(|fps| *fps)
    }

    // ===== Shutdown =====

    /// Stop accepting work: wake the renderer for exit, cancel any waiting
    /// snapshot and drop the unconsumed frame
    pub fn close(&self) {
        self.shared.signal.close();
        self.shared.snapshots.cancel();
        self.shared.slot.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.signal.is_closed()
    }
}

/// A running preview: producer, render thread and their shared state
pub struct PreviewSession {
    handle: SessionHandle,
    capture: CaptureController,
    render: Option<RenderHost>,
}

impl PreviewSession {
    /// Start the render thread, then the producer for the configured facing
    ///
    /// GPU initialisation failures are returned. A source that cannot be
    /// opened is logged and leaves the session running with nothing to draw.
    pub fn start(config: &Config, factory: Box<dyn SourceFactory>) -> AppResult<Self> {
        let handle = SessionHandle::new(config.initial_facing);
        let render = RenderHost::spawn(handle.clone(), RenderOptions::from_config(config))?;

        let transform = media::transform_for(config);
        let mut capture = CaptureController::new(
            factory,
            transform,
            handle.clone(),
            config.initial_facing,
            config.fps_window(),
        );

        if let Err(e) = capture.start() {
            warn!(error = %e, "Camera unavailable, preview will stay empty");
        }

        info!(facing = %config.initial_facing, "Preview session started");
        Ok(Self {
            handle,
            capture,
            render: Some(render),
        })
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn capture(&mut self) -> &mut CaptureController {
        &mut self.capture
    }

    /// Switch between back and front cameras
    pub fn switch_camera(&mut self) -> Result<Orientation, CaptureError> {
        self.capture.switch_camera()
    }

    /// Adapter driving the render thread; `None` after shutdown
    pub fn device_info(&self) -> Option<&GpuDeviceInfo> {
        self.render.as_ref().map(RenderHost::device_info)
    }

    /// Forward a viewport size change to the render thread
    pub fn resize(&self, width: u32, height: u32) {
        if let Some(render) = &self.render {
            render.resize(width, height);
        }
    }

    /// Stop the producer, then the render thread
    ///
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.capture.stop();
        if let Some(render) = self.render.take() {
            render.shutdown();
            info!("Preview session stopped");
        }
        self.handle.close();
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::signal::WaitOutcome;
    use std::time::Duration;

    #[test]
    fn test_publish_then_consume() {
        let handle = SessionHandle::default();
        handle.publish(Frame::filled(2, 2, 7));
        assert_eq!(handle.frames_published(), 1);
        assert_eq!(handle.consume(), Some(Frame::filled(2, 2, 7)));
        assert_eq!(handle.consume(), None);
    }

    #[test]
    fn test_orientation_change_requests_render() {
        let handle = SessionHandle::new(Orientation::Back);
        handle.set_orientation(Orientation::Front);
        assert_eq!(handle.orientation(), Orientation::Front);
        assert_eq!(
            handle.signal().wait_timeout(Duration::from_millis(10)),
            WaitOutcome::Redraw
        );
    }

    #[test]
    fn test_close_cancels_snapshot() {
        let handle = SessionHandle::default();
        let receiver = handle.request_snapshot_async();
        handle.close();
        assert!(receiver.wait().is_err());
        assert!(handle.is_closed());
    }

    #[test]
    fn test_fps_recorded() {
        let handle = SessionHandle::default();
        assert_eq!(handle.fps(), None);
        handle.record_fps(29.5);
        assert_eq!(handle.fps(), Some(29.5));
    }
}
