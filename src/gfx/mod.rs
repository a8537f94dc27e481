//! # Graphics Module
//!
//! Everything between a loaded model and pixels on screen:
//!
//! - **Transforms** ([`transform`]) - position, Euler rotation and scale
//!   composed into model and normal matrices
//! - **Camera** ([`camera`]) - first-person camera and input accumulation
//! - **Resources** ([`resources`]) - materials, textures and frame uniforms
//! - **Scene** ([`scene`]) - meshes, OBJ loading and the ordered scene map
//! - **Rendering** ([`rendering`]) - uniform binding, the frame loop and the
//!   wgpu backend

pub mod camera;
pub mod rendering;
pub mod resources;
pub mod scene;
pub mod transform;

// Re-export commonly used types
pub use camera::FpsCamera;
pub use rendering::RenderEngine;
pub use transform::Transform;
