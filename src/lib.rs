//! Thistle
//!
//! A minimal real-time 3D model viewer built on wgpu and winit: a
//! first-person camera, Phong lighting with per-object materials, and an
//! ordered scene of OBJ models rendered once per frame.

pub mod app;
pub mod config;
pub mod gfx;
pub mod logging;
pub mod performance;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::App;
pub use config::AppConfig;
