//! Shader program: compiled vertex and fragment stages linked into one
//! render pipeline.
//!
//! Compilation failures are caught with wgpu validation error scopes and
//! surfaced as [`ShaderError`] with the driver's log, instead of the default
//! uncaptured-error panic.

use std::fmt;

use thiserror::Error;

use super::uniforms::UniformLayout;
use crate::gfx::{resources::texture_resource::TextureResource, scene::Vertex3D};

pub const PHONG_VERTEX_SHADER: &str = include_str!("phong_vert.wgsl");
pub const PHONG_FRAGMENT_SHADER: &str = include_str!("phong_frag.wgsl");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("shader program failed to link:\n{log}")]
    Link { log: String },
}

/// Where a program draws: color target format plus the bind group layouts
/// for groups 0..n.
pub struct ProgramTargets<'a> {
    pub color_format: wgpu::TextureFormat,
    pub bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
}

/// A linked pipeline and the uniform names it accepts
pub struct ShaderProgram {
    pipeline: wgpu::RenderPipeline,
    layout: UniformLayout,
}

impl ShaderProgram {
    /// Compiles both stages and links them. Either stage failing yields
    /// [`ShaderError::Compile`]; a pipeline that fails validation (mismatched
    /// interfaces or bindings) yields [`ShaderError::Link`].
    pub fn compile(
        device: &wgpu::Device,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
        targets: &ProgramTargets,
        layout: UniformLayout,
    ) -> Result<Self, ShaderError> {
        let vertex = compile_stage(device, label, ShaderStage::Vertex, vertex_source)?;
        let fragment = compile_stage(device, label, ShaderStage::Fragment, fragment_source)?;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", label)),
            bind_group_layouts: targets.bind_group_layouts,
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex,
                entry_point: Some("vs_main"),
                buffers: &[Vertex3D::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: targets.color_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: TextureResource::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(ShaderError::Link {
                log: err.to_string(),
            });
        }

        log::info!("linked shader program '{}'", label);
        Ok(Self { pipeline, layout })
    }

    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }
}

fn compile_stage(
    device: &wgpu::Device,
    label: &str,
    stage: ShaderStage,
    source: &str,
) -> Result<wgpu::ShaderModule, ShaderError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{} ({})", label, stage)),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(ShaderError::Compile {
            stage,
            log: err.to_string(),
        }),
        None => Ok(module),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::rendering::uniforms::{self, DIFFUSE_TEXTURE};

    fn field(name: &str) -> &str {
        name.rsplit('.').next().unwrap_or(name)
    }

    #[test]
    fn test_shaders_declare_every_uniform() {
        let names = [
            uniforms::MODEL,
            uniforms::NORMAL_MATRIX,
            uniforms::VIEW,
            uniforms::PROJECTION,
            uniforms::VIEW_POS,
            uniforms::MATERIAL_AMBIENT,
            uniforms::MATERIAL_DIFFUSE,
            uniforms::MATERIAL_SPECULAR,
            uniforms::MATERIAL_SHININESS,
            uniforms::MATERIAL_USE_TEXTURE,
            uniforms::LIGHT_POSITION,
            uniforms::LIGHT_AMBIENT,
            uniforms::LIGHT_DIFFUSE,
            uniforms::LIGHT_SPECULAR,
        ];
        for name in names {
            let declared = format!("{}:", field(name));
            assert!(
                PHONG_VERTEX_SHADER.contains(&declared) && PHONG_FRAGMENT_SHADER.contains(&declared),
                "'{}' missing from the Phong shaders",
                name
            );
        }
        assert!(PHONG_FRAGMENT_SHADER.contains(&format!("var {}:", DIFFUSE_TEXTURE)));
    }

    #[test]
    fn test_entry_points() {
        assert!(PHONG_VERTEX_SHADER.contains("fn vs_main"));
        assert!(PHONG_FRAGMENT_SHADER.contains("fn fs_main"));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(ShaderStage::Vertex.to_string(), "vertex");
        assert_eq!(ShaderStage::Fragment.to_string(), "fragment");
    }
}
