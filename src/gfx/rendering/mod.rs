//! Core rendering functionality
//!
//! The frame loop ([`frame`]) runs against the [`RenderBackend`] trait;
//! [`RenderEngine`] is the wgpu implementation. Uniform names, their byte
//! layout and the Phong shaders live in [`uniforms`] and [`shader`].

pub mod binding;
pub mod frame;
pub mod render_engine;
pub mod shader;
pub mod shading;
pub mod uniforms;

// Re-export main types
pub use binding::{BindingError, UniformBinder, UniformSink};
pub use frame::{FrameContext, FrameError, FrameOutcome, FrameSettings, RenderBackend};
pub use render_engine::{InitError, RenderEngine};
pub use shader::{ShaderError, ShaderProgram, ShaderStage};
pub use uniforms::{UniformLayout, UniformStaging, UniformValue};
