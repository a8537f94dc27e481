pub mod camera_controller;
pub mod camera_utils;
pub mod fps_camera;

// Re-export main types
pub use camera_controller::{FrameInput, InputState};
pub use camera_utils::{Camera, CameraMovement};
pub use fps_camera::FpsCamera;
