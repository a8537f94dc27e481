// src/gfx/resources/mod.rs
//! GPU resource management
//!
//! Handles textures, materials, and the frame-global bind group.

pub mod global_bindings;
pub mod material;
pub mod texture_resource;

// Re-export main types
pub use global_bindings::{GlobalBindings, GlobalUBO, Light};
pub use material::{ColorSource, Material, MaterialLibrary};
pub use texture_resource::{TextureImage, TextureResource};
