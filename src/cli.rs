// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! - Capturing a single processed frame without a terminal UI
//! - Printing the effective configuration

use edgecam::backends::camera::BuiltinSourceFactory;
use edgecam::constants::timing::CAPTURE_TIMEOUT_SECS;
use edgecam::errors::SnapshotError;
use edgecam::preview::{Orientation, PreviewSession};
use edgecam::{Config, storage};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Options for the `capture` command
pub struct CaptureOptions {
    pub frames: u64,
    pub front: bool,
    pub image: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

/// Run the pipeline headless, wait for `frames` frames, save one snapshot
pub fn capture(mut config: Config, options: CaptureOptions) -> Result<(), Box<dyn std::error::Error>> {
    if options.front {
        config.initial_facing = Orientation::Front;
    }

    let mut factory = BuiltinSourceFactory::from_config(&config);
    if let Some(image) = options.image {
        factory = factory.with_image(config.initial_facing, image);
    }

    let mut session = PreviewSession::start(&config, Box::new(factory))?;
    if !session.capture().is_running() {
        return Err("Camera unavailable".into());
    }

    let handle = session.handle();
    if let Some(info) = session.device_info() {
        println!("Rendering on {} ({:?})", info.adapter_name, info.backend);
    }
    println!(
        "Capturing from {} camera ({} transform)...",
        config.initial_facing,
        config.transform.display_name()
    );

    // Let the source warm up for the requested number of frames
    let deadline = Instant::now() + Duration::from_secs(CAPTURE_TIMEOUT_SECS);
    while handle.frames_published() < options.frames.max(1) {
        if Instant::now() >= deadline {
            return Err(format!(
                "Timed out after {} of {} frames",
                handle.frames_published(),
                options.frames
            )
            .into());
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    let mut receiver = handle.request_snapshot_async();
    let image = loop {
        match receiver.try_recv() {
            Some(Ok(image)) => break image,
            // Serviced before the renderer had a frame; ask again
            Some(Err(SnapshotError::NothingDrawn)) => receiver = handle.request_snapshot_async(),
            Some(Err(e)) => return Err(e.into()),
            None => {}
        }
        if Instant::now() >= deadline {
            return Err("Timed out waiting for snapshot".into());
        }
        std::thread::sleep(Duration::from_millis(10));
    };

    if let Some(fps) = handle.fps() {
        println!("Producer rate: {:.1} fps", fps);
    }
    println!(
        "Frames: {} published, {} replaced before drawing",
        handle.frames_published(),
        handle.frames_dropped()
    );
    session.shutdown();

    let path = save(&image, options.output.as_deref(), &config)?;
    println!("Snapshot saved: {}", path.display());
    Ok(())
}

/// Save into a directory with a generated name, or at an exact file path
fn save(
    image: &image::RgbaImage,
    output: Option<&Path>,
    config: &Config,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match output {
        Some(path) if !path.is_dir() => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            storage::write_jpeg(image, path, config.jpeg_quality)?;
            Ok(path.to_path_buf())
        }
        Some(dir) => Ok(storage::save_snapshot(image, Some(dir), config.jpeg_quality)?),
        None => Ok(storage::save_snapshot(
            image,
            config.snapshot_dir.as_deref(),
            config.jpeg_quality,
        )?),
    }
}

/// Print the effective configuration and where it is read from
pub fn show_config(config: &Config, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(path) if path.exists() => println!("# {}", path.display()),
        Some(path) => println!("# {} (not found, using defaults)", path.display()),
        None => println!("# no config directory, using defaults"),
    }
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
