// SPDX-License-Identifier: GPL-3.0-only

//! Writing snapshots to disk

use crate::constants::{app_info, snapshot};
use crate::errors::SnapshotError;
use image::RgbaImage;
use image::codecs::jpeg::JpegEncoder;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default snapshot directory: `<pictures>/edgecam`, or the working
/// directory when the platform has no pictures folder
pub fn default_snapshot_dir() -> PathBuf {
    dirs::picture_dir()
        .map(|dir| dir.join(app_info::APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Encode `image` as JPEG into `dir` (or the default directory)
///
/// Files are named `Capture_<YYYYmmdd_HHMMSS>.jpg`; a numeric suffix is
/// added when two snapshots land in the same second. JPEG has no alpha
/// channel, so the image is flattened to RGB first.
pub fn save_snapshot(
    image: &RgbaImage,
    dir: Option<&Path>,
    quality: u8,
) -> Result<PathBuf, SnapshotError> {
    let dir = dir.map(Path::to_path_buf).unwrap_or_else(default_snapshot_dir);
    std::fs::create_dir_all(&dir)?;

    let timestamp = chrono::Local::now().format(snapshot::TIMESTAMP_FORMAT);
    let stem = format!("{}{}", snapshot::FILE_PREFIX, timestamp);
    let path = unique_path(&dir, &stem, "jpg");

    write_jpeg(image, &path, quality)?;
    info!(path = %path.display(), width = image.width(), height = image.height(), "Snapshot saved");
    Ok(path)
}

/// Encode `image` as JPEG at exactly `path`
pub fn write_jpeg(image: &RgbaImage, path: &Path, quality: u8) -> Result<(), SnapshotError> {
    let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)?;
    Ok(())
}

fn unique_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let first = dir.join(format!("{}.{}", stem, extension));
    if !first.exists() {
        return first;
    }
    (1u32..)
        .map(|n| dir.join(format!("{}_{}.{}", stem, n, extension)))
        .find(|candidate| !candidate.exists())
        .inspect(|path| debug!(path = %path.display(), "Snapshot name taken, using suffix"))
        .unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("edgecam-storage-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_save_snapshot_writes_jpeg() {
        let dir = scratch_dir("jpeg");
        let image = RgbaImage::from_pixel(8, 4, image::Rgba([255, 0, 0, 255]));

        let path = save_snapshot(&image, Some(&dir), 90).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("Capture_"));
        assert!(name.ends_with(".jpg"));

        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_same_second_gets_suffix() {
        let dir = scratch_dir("suffix");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Capture_x.jpg"), b"").unwrap();

        let path = unique_path(&dir, "Capture_x", "jpg");
        assert_eq!(path, dir.join("Capture_x_1.jpg"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
