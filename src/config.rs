// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::types::SensorRotation;
use crate::constants::{TransformKind, app_info, capture, edge, render, snapshot, timing};
use crate::errors::{AppError, AppResult};
use crate::preview::Orientation;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Configuration file name inside the application config directory
const CONFIG_FILE: &str = "config.json";

/// User configuration
///
/// Every field has a default so partial files written by older versions
/// still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Requested capture width
    pub capture_width: u32,
    /// Requested capture height
    pub capture_height: u32,
    /// Requested capture frame rate
    pub capture_framerate: u32,
    /// Camera facing selected at startup
    pub initial_facing: Orientation,
    /// Mounting rotation of the back sensor
    pub back_rotation: SensorRotation,
    /// Mounting rotation of the front sensor
    pub front_rotation: SensorRotation,
    /// Weak edge threshold
    pub edge_low_threshold: u16,
    /// Strong edge threshold
    pub edge_high_threshold: u16,
    /// Transform applied to every captured frame
    pub transform: TransformKind,
    /// Offscreen viewport width
    pub viewport_width: u32,
    /// Offscreen viewport height
    pub viewport_height: u32,
    /// JPEG quality for saved snapshots (1-100)
    pub jpeg_quality: u8,
    /// Where snapshots are written; `None` means `<pictures>/edgecam`
    pub snapshot_dir: Option<PathBuf>,
    /// FPS measurement window in milliseconds
    pub fps_window_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture_width: capture::DEFAULT_WIDTH,
            capture_height: capture::DEFAULT_HEIGHT,
            capture_framerate: capture::DEFAULT_FRAMERATE,
            initial_facing: Orientation::Back,
            back_rotation: SensorRotation::None,
            front_rotation: SensorRotation::None,
            edge_low_threshold: edge::DEFAULT_LOW_THRESHOLD,
            edge_high_threshold: edge::DEFAULT_HIGH_THRESHOLD,
            transform: TransformKind::default(),
            viewport_width: render::DEFAULT_VIEWPORT_WIDTH,
            viewport_height: render::DEFAULT_VIEWPORT_HEIGHT,
            jpeg_quality: snapshot::DEFAULT_JPEG_QUALITY,
            snapshot_dir: None,
            fps_window_ms: timing::FPS_WINDOW_MS,
        }
    }
}

impl Config {
    /// Default location: `<config_dir>/edgecam/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(app_info::APP_DIR).join(CONFIG_FILE))
    }

    /// Load from the default location, falling back to defaults when there is none
    pub fn load() -> AppResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No config directory on this platform, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from an explicit path
    ///
    /// A missing file yields defaults; a file that exists but does not parse
    /// is an error rather than being silently replaced.
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(AppError::Config(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let config: Config = serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("invalid {}: {}", path.display(), e)))?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config.sanitized())
    }

    /// Save to the default location
    pub fn save(&self) -> AppResult<()> {
        let path = Self::default_path()
            .ok_or_else(|| AppError::Config("no config directory available".to_string()))?;
        self.save_to(&path)
    }

    /// Save as pretty JSON, creating parent directories as needed
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Sensor rotation for the given camera facing
    pub fn rotation_for(&self, facing: Orientation) -> SensorRotation {
        match facing {
            Orientation::Back => self.back_rotation,
            Orientation::Front => self.front_rotation,
        }
    }

    /// FPS window as a duration
    pub fn fps_window(&self) -> Duration {
        Duration::from_millis(self.fps_window_ms)
    }

    /// Clamp values that would make the pipeline misbehave
    fn sanitized(mut self) -> Self {
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        if self.edge_low_threshold > self.edge_high_threshold {
            std::mem::swap(&mut self.edge_low_threshold, &mut self.edge_high_threshold);
        }
        if self.fps_window_ms == 0 {
            self.fps_window_ms = timing::FPS_WINDOW_MS;
        }
        self.capture_framerate = self.capture_framerate.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"capture_width": 1280}"#).unwrap();
        assert_eq!(config.capture_width, 1280);
        assert_eq!(config.capture_height, capture::DEFAULT_HEIGHT);
        assert_eq!(config.transform, TransformKind::Edge);
    }

    #[test]
    fn test_sanitize_swaps_inverted_thresholds() {
        let config = Config {
            edge_low_threshold: 200,
            edge_high_threshold: 20,
            jpeg_quality: 0,
            fps_window_ms: 0,
            ..Config::default()
        }
        .sanitized();
        assert_eq!(config.edge_low_threshold, 20);
        assert_eq!(config.edge_high_threshold, 200);
        assert_eq!(config.jpeg_quality, 1);
        assert_eq!(config.fps_window_ms, timing::FPS_WINDOW_MS);
    }

    #[test]
    fn test_rotation_for_facing() {
        let config = Config {
            back_rotation: SensorRotation::Rotate90,
            front_rotation: SensorRotation::Rotate270,
            ..Config::default()
        };
        assert_eq!(config.rotation_for(Orientation::Back), SensorRotation::Rotate90);
        assert_eq!(config.rotation_for(Orientation::Front), SensorRotation::Rotate270);
    }
}
