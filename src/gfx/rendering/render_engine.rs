//! wgpu rendering backend
//!
//! Owns the surface, device and the Phong program, and implements
//! [`RenderBackend`] for the frame loop. Uniform writes land in a CPU
//! [`UniformStaging`] copy; every `draw_model` snapshots the object block
//! into a dynamic-offset buffer together with the bound texture, and
//! `end_frame` uploads everything and encodes a single render pass.

use std::sync::Arc;

use thiserror::Error;

use super::{
    binding::{BindingError, UniformSink},
    frame::{FrameError, RenderBackend},
    shader::{ProgramTargets, ShaderError, ShaderProgram, PHONG_FRAGMENT_SHADER, PHONG_VERTEX_SHADER},
    uniforms::{UniformLayout, UniformStaging, UniformValue, FRAME_BLOCK_SIZE, OBJECT_BLOCK_SIZE},
};
use crate::{
    gfx::{
        resources::{
            global_bindings::{GlobalBindings, GlobalUBO},
            texture_resource::{TextureImage, TextureResource},
        },
        scene::Model,
    },
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::DynamicUniformBuffer,
    },
};

/// Object slots allocated up front; the buffer grows past this on demand.
const INITIAL_OBJECT_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to create a surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter: {0}")]
    RequestAdapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to open the GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error(transparent)]
    Shader(#[from] ShaderError),
}

struct DrawCommand {
    model: Arc<Model>,
    object_offset: u32,
    texture: Arc<TextureImage>,
}

struct PendingFrame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    clear_color: [f32; 3],
    draws: Vec<DrawCommand>,
}

pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    program: ShaderProgram,
    staging: UniformStaging,
    global_ubo: GlobalUBO,
    global_bindings: GlobalBindings,
    object_layout: BindGroupLayoutWithDesc,
    object_ubo: DynamicUniformBuffer,
    object_bind_group: wgpu::BindGroup,
    texture_layout: BindGroupLayoutWithDesc,
    // Bound for vertex-colored draws; the fragment stage ignores it.
    fallback_texture: Arc<TextureImage>,
    frame: Option<PendingFrame>,
}

impl RenderEngine {
    /// Opens a device for `window` and links the Phong program.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<RenderEngine, InitError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or(InitError::NoSurfaceFormat)?;

        // Frame pacing is done by the event loop, so skip vsync when possible.
        let present_mode = if surface_capabilities
            .present_modes
            .contains(&wgpu::PresentMode::Immediate)
        {
            wgpu::PresentMode::Immediate
        } else {
            wgpu::PresentMode::Fifo
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode,
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = TextureResource::create_depth_texture(&device, &config, "depth_texture");

        // Group 0: frame uniforms
        let global_ubo = GlobalUBO::new(&device, "Frame Uniforms", FRAME_BLOCK_SIZE as u64);
        let mut global_bindings = GlobalBindings::new(&device);
        global_bindings.create_bind_group(&device, &global_ubo);

        // Group 1: per-object uniforms at a dynamic offset
        let object_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::dynamic_uniform(OBJECT_BLOCK_SIZE as u64))
            .create(&device, "Object Bind Group Layout");
        let object_ubo = DynamicUniformBuffer::new(
            &device,
            "Object Uniforms",
            OBJECT_BLOCK_SIZE as u64,
            INITIAL_OBJECT_CAPACITY,
        );
        let object_bind_group = create_object_bind_group(&device, &object_layout, &object_ubo);

        // Group 2: diffuse texture and sampler
        let texture_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(&device, "Diffuse Texture Bind Group Layout");

        let program = ShaderProgram::compile(
            &device,
            "Phong",
            PHONG_VERTEX_SHADER,
            PHONG_FRAGMENT_SHADER,
            &ProgramTargets {
                color_format: format,
                bind_group_layouts: &[
                    global_bindings.bind_group_layout(),
                    &object_layout.layout,
                    &texture_layout.layout,
                ],
            },
            UniformLayout::phong(),
        )?;
        let staging = UniformStaging::new(program.layout().clone());

        Ok(RenderEngine {
            surface,
            device,
            queue,
            config,
            depth_texture,
            program,
            staging,
            global_ubo,
            global_bindings,
            object_layout,
            object_ubo,
            object_bind_group,
            texture_layout,
            fallback_texture: Arc::new(TextureImage::solid_color("fallback white", [1.0; 3])),
            frame: None,
        })
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "depth_texture");
    }
}

fn create_object_bind_group(
    device: &wgpu::Device,
    layout: &BindGroupLayoutWithDesc,
    ubo: &DynamicUniformBuffer,
) -> wgpu::BindGroup {
    BindGroupBuilder::new(layout)
        .resource(ubo.binding_resource())
        .create(device, "Object Bind Group")
}

fn create_texture_bind_group(
    device: &wgpu::Device,
    layout: &BindGroupLayoutWithDesc,
    resource: &TextureResource,
) -> wgpu::BindGroup {
    BindGroupBuilder::new(layout)
        .texture(&resource.view)
        .sampler(&resource.sampler)
        .create(device, "Diffuse Texture Bind Group")
}

/// Lost and outdated surfaces are reconfigured by the caller and only cost
/// the current frame.
fn map_surface_error(err: wgpu::SurfaceError) -> FrameError {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => FrameError::SurfaceLost,
        wgpu::SurfaceError::Timeout => FrameError::SurfaceTimeout,
        wgpu::SurfaceError::OutOfMemory => FrameError::OutOfMemory,
        other => FrameError::Surface(other.to_string()),
    }
}

impl UniformSink for RenderEngine {
    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), BindingError> {
        self.staging.set_uniform(name, value)
    }

    fn bind_texture(
        &mut self,
        name: &str,
        unit: u32,
        texture: &Arc<TextureImage>,
    ) -> Result<(), BindingError> {
        self.staging.bind_texture(name, unit, texture)
    }

    fn unbind_texture(&mut self, unit: u32) {
        self.staging.unbind_texture(unit);
    }
}

impl RenderBackend for RenderEngine {
    fn begin_frame(&mut self, clear_color: [f32; 3]) -> Result<(), FrameError> {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(err) => {
                let err = map_surface_error(err);
                if err == FrameError::SurfaceLost {
                    self.reconfigure();
                }
                return Err(err);
            }
        };

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.object_ubo.reset();
        self.frame = Some(PendingFrame {
            surface_texture,
            view,
            clear_color,
            draws: Vec::new(),
        });
        Ok(())
    }

    fn draw_model(&mut self, model: &Arc<Model>) -> Result<(), FrameError> {
        let Some(frame) = self.frame.as_mut() else {
            return Err(FrameError::Surface(format!(
                "draw of '{}' outside of a frame",
                model.name
            )));
        };

        let object_offset = self.object_ubo.push(self.staging.object_block());
        let texture = self
            .staging
            .bound_texture()
            .cloned()
            .unwrap_or_else(|| self.fallback_texture.clone());

        frame.draws.push(DrawCommand {
            model: model.clone(),
            object_offset,
            texture,
        });
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), FrameError> {
        let Some(frame) = self.frame.take() else {
            return Ok(());
        };

        self.global_ubo
            .update_content(&self.queue, self.staging.frame_block());
        if self.object_ubo.upload(&self.device, &self.queue) {
            log::debug!("object uniform buffer grew to {} slots", self.object_ubo.len());
            self.object_bind_group =
                create_object_bind_group(&self.device, &self.object_layout, &self.object_ubo);
        }

        let device = &self.device;
        let queue = &self.queue;
        let texture_layout = &self.texture_layout;
        let resolved: Vec<_> = frame
            .draws
            .iter()
            .map(|draw| {
                let buffers = draw.model.gpu_buffers(device);
                let texture = draw.texture.gpu_binding(device, queue, |resource| {
                    create_texture_bind_group(device, texture_layout, resource)
                });
                (buffers, &texture.bind_group, draw.object_offset)
            })
            .collect();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let [r, g, b] = frame.clear_color;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(self.program.pipeline());
            if let Some(globals) = self.global_bindings.bind_group() {
                render_pass.set_bind_group(0, globals, &[]);
            }

            for (buffers, texture_bind_group, object_offset) in &resolved {
                render_pass.set_bind_group(1, &self.object_bind_group, &[*object_offset]);
                render_pass.set_bind_group(2, *texture_bind_group, &[]);
                render_pass.set_vertex_buffer(0, buffers.vertex_buffer.slice(..));
                render_pass.set_index_buffer(buffers.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..buffers.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.surface_texture.present();
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.reconfigure();
    }
}
