// SPDX-License-Identifier: GPL-3.0-only

//! Frame sources and the capture subsystem
//!
//! ```text
//! ┌────────────────────┐   open(facing)   ┌───────────────────┐
//! │ CaptureController  │ ───────────────► │   SourceFactory   │
//! └─────────┬──────────┘                  └─────────┬─────────┘
//!           │ owns                                  │ builds
//!           ▼                                       ▼
//! ┌────────────────────┐   next_frame()   ┌───────────────────┐
//! │CaptureLoopController│ ──────────────► │ dyn FrameSource   │
//! └────────────────────┘                  └───────────────────┘
//! ```

pub mod capture;
pub mod file_source;
pub mod frame_loop;
pub mod test_pattern;
pub mod types;

pub use capture::CaptureController;
pub use file_source::ImageFileSource;
pub use frame_loop::{CaptureLoopController, LoopAction};
pub use test_pattern::TestPatternSource;
pub use types::*;

use crate::config::Config;
use crate::preview::Orientation;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// A camera or camera-like producer of raw frames
///
/// Implementations copy pixel data out of any device buffer before
/// returning so the device can reuse it immediately.
pub trait FrameSource: Send {
    /// Next frame, or `None` if none is due yet at the source's cadence
    fn next_frame(&mut self) -> CaptureResult<Option<RawFrame>>;

    /// Human-readable name for logs
    fn name(&self) -> String;
}

/// Opens the source for a camera facing
///
/// Device enumeration and permission handling live behind this trait.
pub trait SourceFactory: Send {
    fn open(&mut self, facing: Orientation) -> CaptureResult<Box<dyn FrameSource>>;
}

impl<F> SourceFactory for F
where
    F: FnMut(Orientation) -> CaptureResult<Box<dyn FrameSource>> + Send,
{
    fn open(&mut self, facing: Orientation) -> CaptureResult<Box<dyn FrameSource>> {
        self(facing)
    }
}

/// Emits at most one frame per interval
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Duration,
    next_due: Option<Instant>,
}

impl FramePacer {
    /// Pacer for `framerate` frames per second; zero disables pacing
    pub fn new(framerate: u32) -> Self {
        let interval = if framerate == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / framerate
        };
        Self {
            interval,
            next_due: None,
        }
    }

    /// Whether a frame is due at `now`; advances the schedule if so
    pub fn ready_at(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now < due => false,
            Some(due) => {
                // Skip missed slots instead of bursting to catch up
                let next = due + self.interval;
                self.next_due = Some(if next <= now { now + self.interval } else { next });
                true
            }
            None => {
                self.next_due = Some(now + self.interval);
                true
            }
        }
    }

    pub fn ready(&mut self) -> bool {
        self.ready_at(Instant::now())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Sources bundled with the application
///
/// Serves a still image when one is configured for the facing and a
/// synthetic pattern otherwise.
#[derive(Debug, Clone)]
pub struct BuiltinSourceFactory {
    width: u32,
    height: u32,
    framerate: u32,
    back_image: Option<PathBuf>,
    front_image: Option<PathBuf>,
}

impl BuiltinSourceFactory {
    pub fn from_config(config: &Config) -> Self {
        Self {
            width: config.capture_width,
            height: config.capture_height,
            framerate: config.capture_framerate,
            back_image: None,
            front_image: None,
        }
    }

    /// Stream `path` for the given facing instead of the test pattern
    pub fn with_image(mut self, facing: Orientation, path: PathBuf) -> Self {
        match facing {
            Orientation::Back => self.back_image = Some(path),
            Orientation::Front => self.front_image = Some(path),
        }
        self
    }
}

impl SourceFactory for BuiltinSourceFactory {
    fn open(&mut self, facing: Orientation) -> CaptureResult<Box<dyn FrameSource>> {
        let image = match facing {
            Orientation::Back => &self.back_image,
            Orientation::Front => &self.front_image,
        };

        match image {
            Some(path) => Ok(Box::new(ImageFileSource::open(path, self.framerate)?)),
            None => Ok(Box::new(TestPatternSource::new(
                self.width,
                self.height,
                self.framerate,
                facing,
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pacer_spacing() {
        let mut pacer = FramePacer::new(10);
        assert_eq!(pacer.interval(), Duration::from_millis(100));
        let t0 = Instant::now();
        assert!(pacer.ready_at(t0));
        assert!(!pacer.ready_at(t0 + Duration::from_millis(50)));
        assert!(pacer.ready_at(t0 + Duration::from_millis(100)));
    }

    #[test]
    fn test_pacer_skips_missed_slots() {
        let mut pacer = FramePacer::new(10);
        let t0 = Instant::now();
        assert!(pacer.ready_at(t0));
        assert!(pacer.ready_at(t0 + Duration::from_millis(550)));
        assert!(!pacer.ready_at(t0 + Duration::from_millis(600)));
        assert!(pacer.ready_at(t0 + Duration::from_millis(650)));
    }

    #[test]
    fn test_unpaced_always_ready() {
        let mut pacer = FramePacer::new(0);
        let t0 = Instant::now();
        assert!(pacer.ready_at(t0));
        assert!(pacer.ready_at(t0));
    }

    #[test]
    fn test_builtin_factory_falls_back_to_pattern() {
        let mut factory = BuiltinSourceFactory::from_config(&Config::default());
        let source = factory.open(Orientation::Front).unwrap();
        assert!(source.name().contains("front"));
    }

    #[test]
    fn test_builtin_factory_missing_image_fails() {
        let mut factory = BuiltinSourceFactory::from_config(&Config::default())
            .with_image(Orientation::Back, PathBuf::from("/nonexistent/edgecam.png"));
        assert!(factory.open(Orientation::Back).is_err());
    }
}
