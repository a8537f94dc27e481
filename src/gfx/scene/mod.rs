//! # Scene Management Module
//!
//! Flat, insertion-ordered scene of placed models, plus the mesh/model
//! types and the OBJ loader that produces them.
//!
//! ## Key Components
//!
//! - [`Scene`] - identifier -> (shared model, transform) mapping with
//!   deterministic traversal order
//! - [`Model`] / [`Mesh`] - immutable indexed geometry plus a shared material
//! - [`load_model`] - OBJ/MTL loading through a [`MaterialLibrary`]
//! - [`Vertex3D`] - position, color, normal, texture-coordinate vertex
//!
//! ## Usage
//!
//! ```no_run
//! use std::{path::Path, sync::Arc};
//! use thistle::gfx::{resources::material::MaterialLibrary, scene::{load_model, Scene}, transform::Transform};
//!
//! let mut library = MaterialLibrary::new();
//! let mut scene = Scene::new();
//! let model = load_model(Path::new("assets/cube.obj"), &mut library).unwrap();
//! scene.add("cube", Arc::new(model), Transform::identity()).unwrap();
//! ```
//!
//! [`MaterialLibrary`]: crate::gfx::resources::material::MaterialLibrary

pub mod loader;
pub mod model;
pub mod scene;
pub mod vertex;

// Re-export main types
pub use loader::{load_model, LoadError};
pub use model::{Mesh, MeshBuffers, Model};
pub use scene::{Scene, SceneEntry, SceneError, SceneStatistics};
pub use vertex::Vertex3D;
