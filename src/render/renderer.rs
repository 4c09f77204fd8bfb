// SPDX-License-Identifier: GPL-3.0-only

//! Preview renderer
//!
//! Draws the newest published frame as a full-viewport textured quad and
//! services snapshot requests from the drawn result. Lives on the render
//! thread for its whole life; the session handle is its only link to other
//! threads.

use crate::backends::camera::SensorRotation;
use crate::constants::render::{BYTES_PER_PIXEL, CLEAR_COLOR};
use crate::errors::{RenderError, SnapshotError};
use crate::gpu::PreviewSurface;
use crate::preview::snapshot::{RowOrder, assemble_image};
use crate::preview::{Frame, Orientation, QUAD_POSITIONS, SessionHandle, UvTable, uv_table};
use crate::shaders::{FRAGMENT_ENTRY, POSITION_LOCATION, PREVIEW_SHADER, TEX_COORD_LOCATION, VERTEX_ENTRY};
use std::marker::PhantomData;
use tracing::{debug, error, info, warn};
use wgpu::util::DeviceExt;

/// What happened to the snapshot request during a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// No request was live
    Idle,
    /// Request fulfilled with the drawn image
    Captured,
    /// Nothing drawable this cycle; request consumed without an image
    Skipped,
    /// Read-back failed; request consumed
    Failed,
}

/// Result of one [`PreviewRenderer::on_draw_frame`] call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawOutcome {
    /// A new frame was uploaded before drawing
    pub uploaded: bool,
    /// Orientation read for this draw
    pub orientation: Orientation,
    /// Texture coordinates the quad was drawn with
    pub uvs: UvTable,
    pub snapshot: SnapshotOutcome,
}

/// Texture holding the last uploaded frame
struct FrameTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

/// GPU objects created by [`PreviewRenderer::on_surface_created`]
struct GpuResources {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    position_buffer: wgpu::Buffer,
    back_uv_buffer: wgpu::Buffer,
    front_uv_buffer: wgpu::Buffer,
    frame_texture: FrameTexture,
    has_frame: bool,
}

enum RendererState {
    /// No surface yet, or the surface was destroyed
    Uninitialised,
    Ready(Box<GpuResources>),
    /// Program creation failed; drawing is refused until the next surface
    Failed(String),
}

/// Draws frames from a [`SessionHandle`] onto a [`PreviewSurface`]
///
/// Not `Send`: it is created on the render thread and stays there.
pub struct PreviewRenderer {
    session: SessionHandle,
    back_uvs: UvTable,
    front_uvs: UvTable,
    viewport: (u32, u32),
    state: RendererState,
    _render_thread_only: PhantomData<*const ()>,
}

impl PreviewRenderer {
    pub fn new(
        session: SessionHandle,
        back_rotation: SensorRotation,
        front_rotation: SensorRotation,
    ) -> Self {
        Self {
            session,
            back_uvs: uv_table(Orientation::Back, back_rotation),
            front_uvs: uv_table(Orientation::Front, front_rotation),
            viewport: (0, 0),
            state: RendererState::Uninitialised,
            _render_thread_only: PhantomData,
        }
    }

    /// Build the program, quad buffers and a placeholder texture
    ///
    /// Called again after a context loss; everything is recreated and the
    /// previously uploaded frame is forgotten.
    pub fn on_surface_created(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
    ) -> Result<(), RenderError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let (pipeline, bind_group_layout) = create_pipeline(device, format);
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            let message = err.to_string();
            error!(error = %message, "Preview program failed to build");
            self.state = RendererState::Failed(message.clone());
            return Err(RenderError::ShaderLink(message));
        }

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("edgecam preview sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let position_buffer = vertex_buffer(device, "edgecam quad positions", &QUAD_POSITIONS);
        let back_uv_buffer = vertex_buffer(device, "edgecam back uvs", &self.back_uvs);
        let front_uv_buffer = vertex_buffer(device, "edgecam front uvs", &self.front_uvs);

        // 1x1 black until the first frame arrives
        let frame_texture = create_frame_texture(device, &bind_group_layout, &sampler, 1, 1);
        queue.write_texture(
            frame_texture.texture.as_image_copy(),
            &[0, 0, 0, 255],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(BYTES_PER_PIXEL),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        self.state = RendererState::Ready(Box::new(GpuResources {
            pipeline,
            bind_group_layout,
            sampler,
            position_buffer,
            back_uv_buffer,
            front_uv_buffer,
            frame_texture,
            has_frame: false,
        }));
        info!(?format, "Preview renderer ready");
        Ok(())
    }

    /// Record the drawable size
    pub fn on_surface_changed(&mut self, width: u32, height: u32) {
        debug!(width, height, "Viewport changed");
        self.viewport = (width, height);
    }

    /// Upload the newest frame if there is one, draw, then service a snapshot
    pub fn on_draw_frame(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface: &PreviewSurface,
    ) -> Result<DrawOutcome, RenderError> {
        let resources = match &mut self.state {
            RendererState::Ready(resources) => resources,
            RendererState::Uninitialised => return Err(RenderError::SurfaceNotReady),
            RendererState::Failed(message) => return Err(RenderError::ShaderLink(message.clone())),
        };

        let uploaded = match self.session.consume() {
            Some(frame) => resources.upload(device, queue, &frame),
            None => false,
        };

        // Read once; a concurrent switch shows up on the next draw
        let orientation = self.session.orientation();
        let (uvs, uv_buffer) = match orientation {
            Orientation::Back => (self.back_uvs, &resources.back_uv_buffer),
            Orientation::Front => (self.front_uvs, &resources.front_uv_buffer),
        };

        let width = self.viewport.0.min(surface.width());
        let height = self.viewport.1.min(surface.height());

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("edgecam preview encoder"),
        });
        {
            let [r, g, b, a] = CLEAR_COLOR;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("edgecam preview pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: surface.view(),
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                ..Default::default()
            });

            if width > 0 && height > 0 {
                pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
                pass.set_pipeline(&resources.pipeline);
                pass.set_bind_group(0, &resources.frame_texture.bind_group, &[]);
                pass.set_vertex_buffer(0, resources.position_buffer.slice(..));
                pass.set_vertex_buffer(1, uv_buffer.slice(..));
                pass.draw(0..QUAD_POSITIONS.len() as u32, 0..1);
            }
        }

        let request = self.session.take_snapshot_request();
        let readback = match request {
            Some(request) if width == 0 || height == 0 || !resources.has_frame => {
                debug!(width, height, "Snapshot skipped, nothing drawn");
                request.fail(SnapshotError::NothingDrawn);
                queue.submit(Some(encoder.finish()));
                return Ok(DrawOutcome {
                    uploaded,
                    orientation,
                    uvs,
                    snapshot: SnapshotOutcome::Skipped,
                });
            }
            Some(request) => {
                let buffer = encode_readback(device, &mut encoder, surface, width, height);
                Some((request, buffer))
            }
            None => None,
        };

        queue.submit(Some(encoder.finish()));

        let snapshot = match readback {
            Some((request, buffer)) => {
                match read_image(device, &buffer, width, height, surface.format()) {
                    Ok(image) => {
                        debug!(width, height, "Snapshot captured");
                        request.fulfil(image);
                        SnapshotOutcome::Captured
                    }
                    Err(e) => {
                        warn!(error = %e, "Snapshot read-back failed");
                        request.fail(e);
                        SnapshotOutcome::Failed
                    }
                }
            }
            None => SnapshotOutcome::Idle,
        };

        Ok(DrawOutcome {
            uploaded,
            orientation,
            uvs,
            snapshot,
        })
    }

    /// Release every GPU object
    pub fn on_surface_destroyed(&mut self) {
        if matches!(self.state, RendererState::Ready(_)) {
            debug!("Preview renderer released");
        }
        self.state = RendererState::Uninitialised;
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, RendererState::Ready(_))
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }
}

impl GpuResources {
    /// Copy `frame` into the frame texture; oversized frames are dropped
    fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, frame: &Frame) -> bool {
        let max = device.limits().max_texture_dimension_2d;
        if frame.width() > max || frame.height() > max {
            warn!(
                width = frame.width(),
                height = frame.height(),
                max,
                "Frame exceeds texture limit, dropped"
            );
            return false;
        }

        if self.frame_texture.width != frame.width() || self.frame_texture.height != frame.height() {
            debug!(
                width = frame.width(),
                height = frame.height(),
                "Recreating frame texture"
            );
            self.frame_texture = create_frame_texture(
                device,
                &self.bind_group_layout,
                &self.sampler,
                frame.width(),
                frame.height(),
            );
        }

        queue.write_texture(
            self.frame_texture.texture.as_image_copy(),
            frame.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(frame.bytes_per_row()),
                rows_per_image: Some(frame.height()),
            },
            wgpu::Extent3d {
                width: frame.width(),
                height: frame.height(),
                depth_or_array_layers: 1,
            },
        );
        self.has_frame = true;
        true
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
) -> (wgpu::RenderPipeline, wgpu::BindGroupLayout) {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("edgecam preview shader"),
        source: wgpu::ShaderSource::Wgsl(PREVIEW_SHADER.into()),
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("edgecam preview bind group layout"),
        entries: &[
            // Frame texture
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            // Sampler
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("edgecam preview pipeline layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let vec2_stride = std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress;
    let position_attributes = [wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x2,
        offset: 0,
        shader_location: POSITION_LOCATION,
    }];
    let tex_coord_attributes = [wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x2,
        offset: 0,
        shader_location: TEX_COORD_LOCATION,
    }];

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("edgecam preview pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some(VERTEX_ENTRY),
            buffers: &[
                wgpu::VertexBufferLayout {
                    array_stride: vec2_stride,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &position_attributes,
                },
                wgpu::VertexBufferLayout {
                    array_stride: vec2_stride,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &tex_coord_attributes,
                },
            ],
            compilation_options: Default::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some(FRAGMENT_ENTRY),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        multiview: None,
        cache: None,
    });

    (pipeline, bind_group_layout)
}

fn vertex_buffer(device: &wgpu::Device, label: &str, data: &[[f32; 2]; 4]) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(data),
        usage: wgpu::BufferUsages::VERTEX,
    })
}

fn create_frame_texture(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    width: u32,
    height: u32,
) -> FrameTexture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("edgecam frame texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("edgecam frame bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    });

    FrameTexture {
        texture,
        bind_group,
        width,
        height,
    }
}

/// Row pitch of a texture-to-buffer copy, aligned as wgpu requires
fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

fn encode_readback(
    device: &wgpu::Device,
    encoder: &mut wgpu::CommandEncoder,
    surface: &PreviewSurface,
    width: u32,
    height: u32,
) -> wgpu::Buffer {
    let bytes_per_row = padded_bytes_per_row(width);
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("edgecam snapshot buffer"),
        size: (bytes_per_row * height) as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    encoder.copy_texture_to_buffer(
        surface.texture().as_image_copy(),
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    buffer
}

fn read_image(
    device: &wgpu::Device,
    buffer: &wgpu::Buffer,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> Result<image::RgbaImage, SnapshotError> {
    let slice = buffer.slice(..);
    let (tx, rx) = futures::channel::oneshot::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    device
        .poll(wgpu::PollType::wait_indefinitely())
        .map_err(|e| SnapshotError::ReadbackFailed(format!("Device poll failed: {:?}", e)))?;

    pollster::block_on(rx)
        .map_err(|_| SnapshotError::ReadbackFailed("Buffer mapping channel closed".into()))?
        .map_err(|e| SnapshotError::ReadbackFailed(format!("Buffer mapping failed: {}", e)))?;

    let bgra = matches!(
        format,
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
    );
    // wgpu copies rows top-down
    let image = {
        let data = slice.get_mapped_range();
        assemble_image(
            &data,
            width,
            height,
            padded_bytes_per_row(width),
            RowOrder::TopDown,
            bgra,
        )
    };
    buffer.unmap();

    image.ok_or_else(|| SnapshotError::ReadbackFailed("Read-back buffer too short".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_bytes_per_row() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
    }

    #[test]
    fn test_draw_before_surface_is_refused() {
        let mut renderer = PreviewRenderer::new(
            SessionHandle::default(),
            SensorRotation::None,
            SensorRotation::None,
        );
        renderer.on_surface_changed(4, 4);
        assert!(!renderer.is_ready());
        assert_eq!(renderer.viewport(), (4, 4));
    }
}
