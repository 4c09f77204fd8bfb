// SPDX-License-Identifier: GPL-3.0-only

//! Frame transforms run by the producer
//!
//! # Modules
//!
//! - [`transform`]: the [`FrameTransform`] seam, output validation and the
//!   grayscale transform
//! - [`edge`]: the edge map transform

pub mod edge;
pub mod transform;

pub use edge::EdgeDetector;
pub use transform::{FrameTransform, GrayscaleTransform, validate_input, validate_output};

use crate::config::Config;
use crate::constants::TransformKind;
use std::sync::Arc;

/// Build the transform selected in the configuration
pub fn transform_for(config: &Config) -> Arc<dyn FrameTransform> {
    match config.transform {
        TransformKind::Edge => Arc::new(EdgeDetector::new(
            config.edge_low_threshold,
            config.edge_high_threshold,
        )),
        TransformKind::Grayscale => Arc::new(GrayscaleTransform),
    }
}
