// SPDX-License-Identifier: GPL-3.0-only

//! GPU initialization utilities for the preview renderer.
//!
//! Creates a headless wgpu device and the offscreen surface the renderer
//! draws into. Everything here is created on, and stays on, the render
//! thread.

use crate::errors::RenderError;
use tracing::{debug, error, info, warn};

pub use wgpu;

/// Color format of the offscreen surface
pub const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Information about the created GPU device
#[derive(Debug, Clone)]
pub struct GpuDeviceInfo {
    /// Name of the GPU adapter
    pub adapter_name: String,
    /// Backend being used (Vulkan, GL, ...)
    pub backend: wgpu::Backend,
}

/// Device, queue and adapter description
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub info: GpuDeviceInfo,
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext").field("info", &self.info).finish()
    }
}

/// Create a wgpu device and queue with no presentation surface.
///
/// # Arguments
///
/// * `label` - A label for the device (for debugging)
pub async fn create_headless_device(label: &str) -> Result<GpuContext, RenderError> {
    info!(label = label, "Creating GPU device");

    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::VULKAN | wgpu::Backends::GL,
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|e| {
            error!(error = %e, "No suitable GPU adapter");
            RenderError::NoDevice(format!("Failed to find suitable GPU adapter: {}", e))
        })?;

    let adapter_info = adapter.get_info();
    info!(
        adapter = %adapter_info.name,
        backend = ?adapter_info.backend,
        "GPU adapter selected for preview"
    );

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                .using_resolution(adapter.limits()),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        })
        .await
        .map_err(|e| {
            error!(error = %e, "GPU device creation failed");
            RenderError::NoDevice(format!("Failed to create GPU device: {}", e))
        })?;

    debug!(max_texture = device.limits().max_texture_dimension_2d, "Device limits");

    Ok(GpuContext {
        device,
        queue,
        info: GpuDeviceInfo {
            adapter_name: adapter_info.name.clone(),
            backend: adapter_info.backend,
        },
    })
}

/// Blocking wrapper around [`create_headless_device`]
pub fn create_headless_device_blocking(label: &str) -> Result<GpuContext, RenderError> {
    pollster::block_on(create_headless_device(label))
}

/// Offscreen color target standing in for a window surface
///
/// Readable with `copy_texture_to_buffer` so snapshots can be taken from it.
#[derive(Debug)]
pub struct PreviewSurface {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl PreviewSurface {
    /// Allocate a surface, clamping each side to `1..=max_texture_dimension_2d`
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let (width, height) = clamp_extent(device, width, height);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("preview_surface"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SURFACE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        debug!(width, height, "Preview surface allocated");
        Self {
            texture,
            view,
            width,
            height,
        }
    }

    /// Reallocate if the size changed
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if (self.width, self.height) != clamp_extent(device, width, height) {
            *self = Self::new(device, width, height);
        }
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        SURFACE_FORMAT
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

fn clamp_extent(device: &wgpu::Device, width: u32, height: u32) -> (u32, u32) {
    let max = device.limits().max_texture_dimension_2d;
    if width > max || height > max {
        warn!(width, height, max, "Surface size clamped to device limit");
    }
    (width.clamp(1, max), height.clamp(1, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_headless_device() {
        // Needs a GPU or a software adapter, skipped otherwise
        match create_headless_device_blocking("test_device") {
            Ok(gpu) => {
                println!("Created device: {:?}", gpu.info);

                let mut surface = PreviewSurface::new(&gpu.device, 0, 0);
                assert_eq!((surface.width(), surface.height()), (1, 1));
                surface.resize(&gpu.device, 64, 32);
                assert_eq!((surface.width(), surface.height()), (64, 32));

                let max = gpu.device.limits().max_texture_dimension_2d;
                surface.resize(&gpu.device, max + 1, 8);
                assert_eq!((surface.width(), surface.height()), (max, 8));
            }
            Err(e) => {
                println!("Skipping test (no GPU): {}", e);
            }
        }
    }
}
