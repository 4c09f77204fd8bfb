// SPDX-License-Identifier: GPL-3.0-only

//! edgecam - live camera preview with on-the-fly frame processing
//!
//! A producer thread pulls frames from a source, runs them through a
//! transform (edge detection by default) and hands the newest result to a
//! render thread, which draws it as a textured quad and can read the drawn
//! image back as a snapshot.
//!
//! # Architecture
//!
//! - [`backends`]: frame sources and the capture subsystem (producer side)
//! - [`media`]: frame transforms
//! - [`preview`]: session state shared between producer and renderer
//! - [`render`]: the renderer and its thread (consumer side)
//! - [`gpu`] and [`shaders`]: wgpu device setup and the preview program
//! - [`config`], [`storage`], [`terminal`]: configuration, snapshot files,
//!   and the terminal front end

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod gpu;
pub mod media;
pub mod preview;
pub mod render;
pub mod shaders;
pub mod storage;
pub mod terminal;

// Re-export commonly used types
pub use config::Config;
pub use constants::TransformKind;
pub use errors::{AppError, AppResult};
pub use preview::{Orientation, PreviewSession, SessionHandle};
