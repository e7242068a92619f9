//! Text pipeline shared by every clock window.
//!
//! Holds the shader pipeline, projection uniform, atlas texture and a single
//! dynamic vertex buffer. Windows render one after another; each render
//! overwrites the buffer with that window's quads before its draw is submitted.

use super::context::GpuContext;
use crate::atlas::AtlasImage;
use crate::text::{TextRenderer, TextVertex, VERTICES_PER_GLYPH};

/// Uniform data for the shader.
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
struct Globals {
    /// Transform matrix (orthographic projection).
    transform: [[f32; 4]; 4], // 64 bytes
}

/// Number of glyphs the vertex buffer can hold.
///
/// Starts at 100 and grows to the next power of two when a frame needs more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphCapacity(usize);

impl GlyphCapacity {
    pub const INITIAL: Self = Self(100);

    pub fn glyphs(self) -> usize {
        self.0
    }

    /// Buffer size in bytes.
    pub fn byte_size(self) -> u64 {
        (self.0 * VERTICES_PER_GLYPH * std::mem::size_of::<TextVertex>()) as u64
    }

    /// Grow to fit `glyphs`. Returns true if the buffer must be reallocated.
    pub fn grow_to(&mut self, glyphs: usize) -> bool {
        if glyphs <= self.0 {
            return false;
        }
        self.0 = glyphs.next_power_of_two();
        true
    }
}

impl Default for GlyphCapacity {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// Single-channel atlas texture with its sampler bind group.
///
/// Dropping it releases the GPU texture.
pub struct AtlasTexture {
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

impl AtlasTexture {
    /// Upload `image` as an R8 texture with linear filtering and repeat wrapping.
    ///
    /// Consumes the image, freeing the host-side pixels once the copy is queued.
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        image: AtlasImage,
    ) -> Self {
        let side = image.side();
        let size = wgpu::Extent3d {
            width: side,
            height: side,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Clockface Atlas Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(side),
                rows_per_image: Some(side),
            },
            size,
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Clockface Atlas Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Clockface Atlas Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        tracing::debug!("Uploaded {}x{} atlas texture", side, side);

        Self { texture, bind_group }
    }

    pub fn side(&self) -> u32 {
        self.texture.width()
    }
}

/// GPU state created once and shared by every clock window.
pub struct RenderResources {
    gpu: GpuContext,
    format: wgpu::TextureFormat,
    pipeline: wgpu::RenderPipeline,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    atlas: AtlasTexture,
    vertex_buffer: wgpu::Buffer,
    capacity: GlyphCapacity,
}

impl RenderResources {
    /// Compile the text pipeline for `format` and upload the atlas.
    pub fn new(gpu: GpuContext, format: wgpu::TextureFormat, atlas_image: AtlasImage) -> Self {
        let device = gpu.device();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Clockface Text Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/text.wgsl").into()),
        });

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Clockface Globals Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let atlas_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Clockface Atlas Layout"),
            entries: &[
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
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Clockface Pipeline Layout"),
            bind_group_layouts: &[&globals_layout, &atlas_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Clockface Text Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<TextVertex>() as u64,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        // position
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: 0,
                            shader_location: 0,
                        },
                        // uv
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: 8,
                            shader_location: 1,
                        },
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Clockface Globals Buffer"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Clockface Globals Bind Group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        let atlas = AtlasTexture::upload(device, gpu.queue(), &atlas_layout, atlas_image);

        let capacity = GlyphCapacity::INITIAL;
        let vertex_buffer = create_vertex_buffer(device, capacity);

        Self {
            gpu,
            format,
            pipeline,
            globals_buffer,
            globals_bind_group,
            atlas,
            vertex_buffer,
            capacity,
        }
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    /// Color format every window surface is configured with.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn atlas(&self) -> &AtlasTexture {
        &self.atlas
    }

    pub fn capacity(&self) -> GlyphCapacity {
        self.capacity
    }

    /// Clear `target` to transparent and draw every queued quad.
    ///
    /// `viewport` is the target size in pixels.
    pub fn render(&mut self, target: &wgpu::TextureView, viewport: (u32, u32), text: &TextRenderer) {
        if self.capacity.grow_to(text.glyph_count()) {
            tracing::debug!("Growing vertex buffer to {} glyphs", self.capacity.glyphs());
            self.vertex_buffer = create_vertex_buffer(self.gpu.device(), self.capacity);
        }

        let queue = self.gpu.queue();
        let globals = Globals {
            transform: create_orthographic_matrix(viewport.0 as f32, viewport.1 as f32),
        };
        queue.write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));
        if !text.is_empty() {
            queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(text.vertices()));
        }

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Clockface Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clockface Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if !text.is_empty() {
                render_pass.set_pipeline(&self.pipeline);
                render_pass.set_bind_group(0, &self.globals_bind_group, &[]);
                render_pass.set_bind_group(1, &self.atlas.bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
                // 6 vertices per glyph (2 triangles)
                render_pass.draw(0..text.vertex_count() as u32, 0..1);
            }
        }

        queue.submit(Some(encoder.finish()));
    }
}

fn create_vertex_buffer(device: &wgpu::Device, capacity: GlyphCapacity) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Clockface Vertex Buffer"),
        size: capacity.byte_size(),
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Orthographic projection mapping `0..width` x `0..height` pixels, origin at
/// the bottom-left, onto clip space.
pub fn create_orthographic_matrix(width: f32, height: f32) -> [[f32; 4]; 4] {
    let sx = 2.0 / width.max(1.0);
    let sy = 2.0 / height.max(1.0);

    [
        [sx, 0.0, 0.0, 0.0],
        [0.0, sy, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [-1.0, -1.0, 0.0, 1.0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Column-major matrix times (x, y, 0, 1).
    fn project(m: &[[f32; 4]; 4], x: f32, y: f32) -> (f32, f32) {
        (
            m[0][0] * x + m[1][0] * y + m[3][0],
            m[0][1] * x + m[1][1] * y + m[3][1],
        )
    }

    #[test]
    fn test_projection_maps_corners() {
        let m = create_orthographic_matrix(120.0, 50.0);
        assert_eq!(project(&m, 0.0, 0.0), (-1.0, -1.0));
        assert_eq!(project(&m, 120.0, 50.0), (1.0, 1.0));
        assert_eq!(project(&m, 60.0, 25.0), (0.0, 0.0));
    }

    #[test]
    fn test_capacity_starts_at_one_hundred_glyphs() {
        let capacity = GlyphCapacity::default();
        assert_eq!(capacity.glyphs(), 100);
        assert_eq!(capacity.byte_size(), 100 * 6 * 16);
    }

    #[test]
    fn test_capacity_grows_past_one_hundred() {
        let mut capacity = GlyphCapacity::INITIAL;
        assert!(!capacity.grow_to(0));
        assert!(!capacity.grow_to(100));
        assert!(capacity.grow_to(101));
        assert_eq!(capacity.glyphs(), 128);
        assert!(!capacity.grow_to(120));
        assert!(capacity.grow_to(129));
        assert_eq!(capacity.glyphs(), 256);
    }

    #[test]
    fn test_globals_size_fits_uniform() {
        assert_eq!(std::mem::size_of::<Globals>(), 64);
        assert_eq!(std::mem::size_of::<TextVertex>(), 16);
    }
}
