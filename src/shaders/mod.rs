// SPDX-License-Identifier: GPL-3.0-only
//! Shader sources for the preview renderer
//!
//! One fixed program: a pass-through vertex stage taking a 2D position and
//! a 2D texture coordinate, and a fragment stage sampling one RGBA texture.

/// WGSL source of the preview program
pub const PREVIEW_SHADER: &str = include_str!("preview.wgsl");

/// Vertex stage entry point
pub const VERTEX_ENTRY: &str = "vs_main";

/// Fragment stage entry point
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Vertex attribute location of the quad position
pub const POSITION_LOCATION: u32 = 0;

/// Vertex attribute location of the texture coordinate
pub const TEX_COORD_LOCATION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    /// Validate that a WGSL shader compiles successfully using naga
    fn validate_shader(name: &str, source: &str) -> naga::Module {
        let module = match naga::front::wgsl::parse_str(source) {
            Ok(module) => module,
            Err(e) => panic!("Shader '{}' parse failed: {:?}", name, e),
        };

        let info = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module);

        if let Err(e) = info {
            panic!("Shader '{}' validation failed: {:?}", name, e);
        }
        module
    }

    #[test]
    fn test_preview_shader_validates() {
        validate_shader("preview", PREVIEW_SHADER);
    }

    #[test]
    fn test_preview_shader_entry_points() {
        let module = validate_shader("preview", PREVIEW_SHADER);
        let names: Vec<&str> = module
            .entry_points
            .iter()
            .map(|entry| entry.name.as_str())
            .collect();
        assert!(names.contains(&VERTEX_ENTRY));
        assert!(names.contains(&FRAGMENT_ENTRY));
    }
}
