// SPDX-License-Identifier: GPL-3.0-only

//! Capture subsystem: the producer side of the preview
//!
//! Each iteration pulls a raw frame, runs the transform, and publishes the
//! result to the session. A frame the transform rejects or mangles is
//! dropped and the loop carries on.

use super::frame_loop::{CaptureLoopController, LoopAction};
use super::types::{CaptureResult, RawFrame};
use super::{FrameSource, SourceFactory};
use crate::constants::timing::SOURCE_IDLE_SLEEP;
use crate::errors::CaptureError;
use crate::media::FrameTransform;
use crate::preview::{FpsCounter, Frame, Orientation, SessionHandle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const CAPTURE_THREAD_NAME: &str = "edgecam-capture";

/// State owned by the producer thread
pub(crate) struct Producer {
    source: Box<dyn FrameSource>,
    transform: Arc<dyn FrameTransform>,
    session: SessionHandle,
    fps: FpsCounter,
}

impl Producer {
    pub(crate) fn new(
        source: Box<dyn FrameSource>,
        transform: Arc<dyn FrameTransform>,
        session: SessionHandle,
        fps_window: Duration,
    ) -> Self {
        Self {
            source,
            transform,
            session,
            fps: FpsCounter::with_window(fps_window),
        }
    }

    /// One loop iteration
    fn step(&mut self) -> LoopAction {
        if self.session.is_closed() {
            return LoopAction::Stop;
        }

        match self.source.next_frame() {
            Ok(Some(raw)) => {
                self.process(raw);
                LoopAction::Continue
            }
            Ok(None) => {
                std::thread::sleep(SOURCE_IDLE_SLEEP);
                LoopAction::Continue
            }
            Err(CaptureError::Disconnected) => {
                warn!(source = %self.source.name(), "Frame source disconnected");
                LoopAction::Stop
            }
            Err(e) => {
                warn!(source = %self.source.name(), error = %e, "Frame source error");
                std::thread::sleep(SOURCE_IDLE_SLEEP);
                LoopAction::Continue
            }
        }
    }

    /// Transform and publish one raw frame; returns whether it was published
    pub(crate) fn process(&mut self, raw: RawFrame) -> bool {
        if let Err(e) = raw.validate() {
            warn!(error = %e, "Dropping malformed raw frame");
            return false;
        }

        let started = Instant::now();
        let result = self
            .transform
            .transform(raw.width, raw.height, &raw.data, raw.row_stride)
            .and_then(|pixels| Frame::new(raw.width, raw.height, pixels));
        debug!(
            transform = self.transform.name(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Frame transformed"
        );

        let frame = match result {
            Ok(frame) => frame,
            Err(e) => {
                warn!(transform = self.transform.name(), error = %e, "Dropping frame");
                return false;
            }
        };

        self.session.publish(frame);
        self.session.request_render();

        if let Some(rate) = self.fps.tick() {
            debug!(fps = rate, "Producer frame rate");
            self.session.record_fps(rate);
        }
        true
    }
}

/// Owns the producer thread and the source it reads from
///
/// `start()` and `stop()` are idempotent. Stopping joins the producer, so
/// nothing is published after `stop()` returns.
pub struct CaptureController {
    factory: Box<dyn SourceFactory>,
    transform: Arc<dyn FrameTransform>,
    session: SessionHandle,
    facing: Orientation,
    fps_window: Duration,
    frame_loop: Option<CaptureLoopController>,
}

impl CaptureController {
    pub fn new(
        factory: Box<dyn SourceFactory>,
        transform: Arc<dyn FrameTransform>,
        session: SessionHandle,
        facing: Orientation,
        fps_window: Duration,
    ) -> Self {
        Self {
            factory,
            transform,
            session,
            facing,
            fps_window,
            frame_loop: None,
        }
    }

    /// Open the source for the current facing and start producing
    ///
    /// Does nothing if the producer is already running.
    pub fn start(&mut self) -> CaptureResult<()> {
        if self.is_running() {
            debug!("Capture already running");
            return Ok(());
        }

        // A loop that ended on its own still needs joining
        if let Some(mut finished) = self.frame_loop.take() {
            finished.join();
        }

        let source = self.factory.open(self.facing)?;
        info!(source = %source.name(), facing = %self.facing, "Opened frame source");

        let mut producer = Producer::new(
            source,
            Arc::clone(&self.transform),
            self.session.clone(),
            self.fps_window,
        );
        let frame_loop = CaptureLoopController::start(CAPTURE_THREAD_NAME, move || producer.step())?;
        self.frame_loop = Some(frame_loop);
        Ok(())
    }

    /// Stop producing and wait for the producer thread to exit
    ///
    /// Does nothing if already stopped.
    pub fn stop(&mut self) {
        if let Some(mut frame_loop) = self.frame_loop.take() {
            frame_loop.stop();
            info!(facing = %self.facing, "Capture stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.frame_loop
            .as_ref()
            .is_some_and(CaptureLoopController::is_running)
    }

    pub fn facing(&self) -> Orientation {
        self.facing
    }

    /// Switch to the other camera
    ///
    /// Updates the preview orientation immediately, then reopens the source
    /// for the new facing. The producer is restarted only if it was running.
    pub fn switch_camera(&mut self) -> CaptureResult<Orientation> {
        let next = self.facing.toggled();
        let was_running = self.is_running();

        self.session.set_orientation(next);
        self.stop();
        self.facing = next;
        info!(facing = %next, "Switching camera");

        if was_running {
            self.start()?;
        }
        Ok(next)
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::TestPatternSource;
    use crate::errors::TransformError;
    use crate::media::GrayscaleTransform;

    fn producer_with(transform: Arc<dyn FrameTransform>) -> (Producer, SessionHandle) {
        let session = SessionHandle::default();
        let producer = Producer::new(
            Box::new(TestPatternSource::unpaced(8, 4, Orientation::Back)),
            transform,
            session.clone(),
            Duration::from_secs(1),
        );
        (producer, session)
    }

    fn raw_frame() -> RawFrame {
        RawFrame {
            width: 2,
            height: 2,
            row_stride: 3,
            data: vec![1, 2, 0, 3, 4, 0].into(),
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_process_publishes_and_requests_render() {
        let (mut producer, session) = producer_with(Arc::new(GrayscaleTransform));
        assert!(producer.process(raw_frame()));
        assert!(session.signal().is_pending());
        let frame = session.consume().unwrap();
        assert_eq!(&frame.pixels()[12..16], &[4, 4, 4, 255]);
    }

    #[test]
    fn test_wrong_sized_output_is_dropped() {
        let short = |_: u32, _: u32, _: &[u8], _: u32| Ok::<_, TransformError>(vec![0u8; 3]);
        let (mut producer, session) = producer_with(Arc::new(short));
        assert!(!producer.process(raw_frame()));
        assert!(session.consume().is_none());
        assert_eq!(session.frames_published(), 0);
    }

    #[test]
    fn test_transform_error_is_dropped() {
        let failing = |_: u32, _: u32, _: &[u8], _: u32| -> Result<Vec<u8>, TransformError> {
            Err(TransformError::Failed("boom".into()))
        };
        let (mut producer, session) = producer_with(Arc::new(failing));
        assert!(!producer.process(raw_frame()));
        // Loop keeps going after a failed frame
        assert_eq!(producer.step(), LoopAction::Continue);
        assert!(session.consume().is_none());
    }

    #[test]
    fn test_step_stops_when_session_closed() {
        let (mut producer, session) = producer_with(Arc::new(GrayscaleTransform));
        session.close();
        assert_eq!(producer.step(), LoopAction::Stop);
    }
}
