// SPDX-License-Identifier: GPL-3.0-only

//! Consumer side of the preview: the renderer and the thread that drives it

pub mod host;
pub mod renderer;

pub use host::{RenderHost, RenderOptions};
pub use renderer::{DrawOutcome, PreviewRenderer, SnapshotOutcome};
