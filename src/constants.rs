// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Frame transform applied by the producer before publishing
///
/// Selects which bundled [`crate::media::FrameTransform`] the capture
/// subsystem runs on every raw frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    /// Double-threshold edge map, white edges on black (default)
    #[default]
    Edge,
    /// Plain luma rendered as opaque gray
    Grayscale,
}

impl TransformKind {
    /// All variants for help text and iteration
    pub const ALL: [TransformKind; 2] = [TransformKind::Edge, TransformKind::Grayscale];

    /// Get display name for the transform
    pub fn display_name(&self) -> &'static str {
        match self {
            TransformKind::Edge => "Edge",
            TransformKind::Grayscale => "Grayscale",
        }
    }
}

/// Capture defaults
pub mod capture {
    /// Default capture width in pixels
    pub const DEFAULT_WIDTH: u32 = 640;

    /// Default capture height in pixels
    pub const DEFAULT_HEIGHT: u32 = 480;

    /// Default capture frame rate
    pub const DEFAULT_FRAMERATE: u32 = 30;

    /// Extra bytes appended to each synthetic row so stride differs from width
    pub const TEST_PATTERN_ROW_PADDING: u32 = 64;
}

/// Edge detector defaults
pub mod edge {
    /// Weak edge threshold on gradient magnitude
    pub const DEFAULT_LOW_THRESHOLD: u16 = 50;

    /// Strong edge threshold on gradient magnitude
    pub const DEFAULT_HIGH_THRESHOLD: u16 = 150;
}

/// Renderer and viewport constants
pub mod render {
    /// Default offscreen viewport width
    pub const DEFAULT_VIEWPORT_WIDTH: u32 = 640;

    /// Default offscreen viewport height
    pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 480;

    /// Clear color used before drawing the quad (opaque black)
    pub const CLEAR_COLOR: [f64; 4] = [0.0, 0.0, 0.0, 1.0];

    /// Bytes per RGBA8 pixel
    pub const BYTES_PER_PIXEL: u32 = 4;
}

/// Timing constants
pub mod timing {
    use super::Duration;

    /// Default FPS measurement window in milliseconds
    pub const FPS_WINDOW_MS: u64 = 1000;

    /// How long the render thread waits for a signal before re-checking shutdown
    pub const RENDER_WAIT_TIMEOUT: Duration = Duration::from_millis(100);

    /// Idle sleep when a source has no frame ready
    pub const SOURCE_IDLE_SLEEP: Duration = Duration::from_millis(5);

    /// Maximum time `capture` waits for the requested number of frames
    pub const CAPTURE_TIMEOUT_SECS: u64 = 10;

    /// Terminal preview refresh interval
    pub const TERMINAL_REFRESH: Duration = Duration::from_millis(50);
}

/// Snapshot persistence constants
pub mod snapshot {
    /// Default JPEG quality for saved snapshots
    pub const DEFAULT_JPEG_QUALITY: u8 = 90;

    /// Filename prefix for saved snapshots
    pub const FILE_PREFIX: &str = "Capture_";

    /// Timestamp format used in snapshot filenames
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
}

/// Supported still image formats for the image file source
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}

/// Application information utilities
pub mod app_info {
    /// Application directory name used under config and pictures dirs
    pub const APP_DIR: &str = "edgecam";

    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
