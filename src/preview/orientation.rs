// SPDX-License-Identifier: GPL-3.0-only

//! Camera facing flag and the quad texture-coordinate tables it selects
//!
//! The flag is written by camera switches and read once per draw cycle.
//! Readers may observe a switch one frame early or late; nothing else
//! depends on the ordering, so a relaxed atomic is sufficient.

use crate::backends::camera::types::SensorRotation;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Active camera facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Rear camera, drawn as-is
    #[default]
    Back,
    /// Selfie camera, drawn mirrored
    Front,
}

impl Orientation {
    /// The other facing
    pub fn toggled(self) -> Self {
        match self {
            Orientation::Back => Orientation::Front,
            Orientation::Front => Orientation::Back,
        }
    }

    pub fn is_mirrored(self) -> bool {
        self == Orientation::Front
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Orientation::Back => "Back",
            Orientation::Front => "Front",
        }
    }

    fn to_bits(self) -> u8 {
        match self {
            Orientation::Back => 0,
            Orientation::Front => 1,
        }
    }

    fn from_bits(bits: u8) -> Self {
        if bits == 0 {
            Orientation::Back
        } else {
            Orientation::Front
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Cross-thread orientation flag
#[derive(Debug, Default)]
pub struct OrientationControl {
    bits: AtomicU8,
}

impl OrientationControl {
    pub fn new(initial: Orientation) -> Self {
        Self {
            bits: AtomicU8::new(initial.to_bits()),
        }
    }

    pub fn set(&self, orientation: Orientation) {
        self.bits.store(orientation.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> Orientation {
        Orientation::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Flip the facing and return the new value
    pub fn toggle(&self) -> Orientation {
        let previous = self.bits.fetch_xor(1, Ordering::Relaxed);
        Orientation::from_bits(previous ^ 1)
    }
}

/// Quad vertex positions in triangle-strip order:
/// bottom-left, bottom-right, top-left, top-right
pub const QUAD_POSITIONS: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];

/// Texture coordinates for one orientation, in [`QUAD_POSITIONS`] order
pub type UvTable = [[f32; 2]; 4];

/// Texture coordinates that show the frame upright
///
/// Texture space has its origin at the top-left texel, so the bottom of the
/// screen samples `v = 1`.
const BASE_UVS: UvTable = [[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]];

/// Vertex indices walked clockwise around the screen: TL, TR, BR, BL
const CLOCKWISE: [usize; 4] = [2, 3, 1, 0];

/// Texture coordinates for `orientation` with the sensor mounted at `rotation`
///
/// The rotation turns the picture clockwise by whole quarter turns. The
/// front table is always the back table mirrored across the screen's
/// vertical axis.
pub fn uv_table(orientation: Orientation, rotation: SensorRotation) -> UvTable {
    let quarter_turns = (rotation.degrees() / 90) as usize;

    let mut uvs = BASE_UVS;
    for (position, &vertex) in CLOCKWISE.iter().enumerate() {
        let source = CLOCKWISE[(position + 4 - quarter_turns) % 4];
        uvs[vertex] = BASE_UVS[source];
    }

    if orientation.is_mirrored() {
        uvs.swap(0, 1);
        uvs.swap(2, 3);
    }
    uvs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        let control = OrientationControl::new(Orientation::Back);
        assert_eq!(control.toggle(), Orientation::Front);
        assert_eq!(control.get(), Orientation::Front);
        assert_eq!(control.toggle(), Orientation::Back);
    }

    #[test]
    fn test_unrotated_back_is_upright() {
        assert_eq!(uv_table(Orientation::Back, SensorRotation::None), BASE_UVS);
    }

    #[test]
    fn test_front_mirrors_u() {
        let back = uv_table(Orientation::Back, SensorRotation::None);
        let front = uv_table(Orientation::Front, SensorRotation::None);
        for (b, f) in back.iter().zip(front.iter()) {
            assert_eq!(f[0], 1.0 - b[0]);
            assert_eq!(f[1], b[1]);
        }
    }

    #[test]
    fn test_rotate_90_top_left_samples_bottom_left() {
        let uvs = uv_table(Orientation::Back, SensorRotation::Rotate90);
        // Screen top-left shows what was the image's bottom-left corner
        assert_eq!(uvs[2], [0.0, 1.0]);
        assert_eq!(uvs[3], [0.0, 0.0]);
        assert_eq!(uvs[1], [1.0, 0.0]);
        assert_eq!(uvs[0], [1.0, 1.0]);
    }

    #[test]
    fn test_rotate_180_is_point_reflection() {
        let uvs = uv_table(Orientation::Back, SensorRotation::Rotate180);
        for (rotated, base) in uvs.iter().zip(BASE_UVS.iter()) {
            assert_eq!(rotated[0], 1.0 - base[0]);
            assert_eq!(rotated[1], 1.0 - base[1]);
        }
    }

    #[test]
    fn test_front_is_screen_mirror_for_every_rotation() {
        for rotation in [
            SensorRotation::None,
            SensorRotation::Rotate90,
            SensorRotation::Rotate180,
            SensorRotation::Rotate270,
        ] {
            let back = uv_table(Orientation::Back, rotation);
            let front = uv_table(Orientation::Front, rotation);
            assert_eq!(front[0], back[1], "{rotation}");
            assert_eq!(front[1], back[0], "{rotation}");
            assert_eq!(front[2], back[3], "{rotation}");
            assert_eq!(front[3], back[2], "{rotation}");
        }
    }
}
