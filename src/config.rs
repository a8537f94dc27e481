//! Application configuration
//!
//! [`AppConfig`] gathers every tunable of the viewer: window, frame pacing,
//! initial camera pose, input sensitivities and the scene light. All values
//! have defaults; [`AppConfig::validate`] checks the invariants the render
//! loop relies on before any window is created.

use thiserror::Error;

use crate::{
    gfx::resources::global_bindings::Light, logging::LoggingConfig, performance::frame_interval,
};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("target fps must be a finite non-negative number, got {0}")]
    InvalidTargetFps(f32),
    #[error("window size must be non-zero, got {width}x{height}")]
    InvalidWindowSize { width: u32, height: u32 },
    #[error("clip planes need 0 < near < far, got near={near} far={far}")]
    InvalidClipPlanes { near: f32, far: f32 },
    #[error("{name} must be a finite non-negative number, got {value}")]
    InvalidSetting { name: &'static str, value: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "3D Model Viewer".to_string(),
            width: 1024,
            height: 768,
        }
    }
}

/// Initial camera pose and projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    pub position: [f32; 3],
    /// Degrees; -90 looks down the negative Z axis.
    pub yaw: f32,
    /// Degrees, clamped to (-89, 89) by the camera.
    pub pitch: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 3.0],
            yaw: -90.0,
            pitch: 0.0,
            fov: 45.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub window: WindowConfig,
    /// Frames per second to pace to; 0 renders as fast as possible.
    pub target_fps: f32,
    pub camera: CameraConfig,
    /// World units per second.
    pub movement_speed: f32,
    /// Degrees of rotation per unit of mouse motion.
    pub mouse_sensitivity: f32,
    /// Speed multiplier while Shift is held.
    pub boost_multiplier: f32,
    /// Degrees of field of view per scroll line.
    pub zoom_speed: f32,
    pub light: Light,
    pub clear_color: [f32; 3],
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            target_fps: 60.0,
            camera: CameraConfig::default(),
            movement_speed: 2.5,
            mouse_sensitivity: 0.1,
            boost_multiplier: 1.5,
            zoom_speed: 1.0,
            light: Light::default(),
            clear_color: [0.1, 0.1, 0.1],
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Builder: set window title and size
    pub fn with_window(mut self, title: &str, width: u32, height: u32) -> Self {
        self.window = WindowConfig {
            title: title.to_string(),
            width,
            height,
        };
        self
    }

    /// Builder: set the frame rate target (0 = unlimited)
    pub fn with_target_fps(mut self, target_fps: f32) -> Self {
        self.target_fps = target_fps;
        self
    }

    /// Builder: set the initial camera position and orientation
    pub fn with_camera_pose(mut self, position: [f32; 3], yaw: f32, pitch: f32) -> Self {
        self.camera.position = position;
        self.camera.yaw = yaw;
        self.camera.pitch = pitch;
        self
    }

    /// Builder: set the camera projection parameters
    pub fn with_projection(mut self, fov: f32, near: f32, far: f32) -> Self {
        self.camera.fov = fov;
        self.camera.near = near;
        self.camera.far = far;
        self
    }

    /// Builder: set movement speed and mouse sensitivity
    pub fn with_controls(mut self, movement_speed: f32, mouse_sensitivity: f32) -> Self {
        self.movement_speed = movement_speed;
        self.mouse_sensitivity = mouse_sensitivity;
        self
    }

    /// Builder: set the scene light
    pub fn with_light(mut self, light: Light) -> Self {
        self.light = light;
        self
    }

    /// Builder: set the logger filter
    pub fn with_log_filter(mut self, filter: &str) -> Self {
        self.logging.env_filter = Some(filter.to_string());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fps = self.target_fps;
        if !fps.is_finite() || fps < 0.0 || (fps > 0.0 && frame_interval(fps).is_none()) {
            return Err(ConfigError::InvalidTargetFps(fps));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::InvalidWindowSize {
                width: self.window.width,
                height: self.window.height,
            });
        }

        let (near, far) = (self.camera.near, self.camera.far);
        if !(near > 0.0) || !(far > near) || !far.is_finite() {
            return Err(ConfigError::InvalidClipPlanes { near, far });
        }

        let settings = [
            ("movement_speed", self.movement_speed),
            ("mouse_sensitivity", self.mouse_sensitivity),
            ("boost_multiplier", self.boost_multiplier),
            ("zoom_speed", self.zoom_speed),
        ];
        for (name, value) in settings {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidSetting { name, value });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
        assert!(AppConfig::default().with_target_fps(0.0).validate().is_ok());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let config = AppConfig::default().with_target_fps(-1.0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidTargetFps(-1.0)));

        let config = AppConfig::default().with_target_fps(f32::NAN);
        assert!(config.validate().is_err());

        let config = AppConfig::default().with_target_fps(1e-20);
        assert_eq!(config.validate(), Err(ConfigError::InvalidTargetFps(1e-20)));

        let config = AppConfig::default().with_window("x", 0, 600);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWindowSize { .. })
        ));

        let config = AppConfig::default().with_projection(45.0, 1.0, 1.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidClipPlanes { .. })
        ));

        let config = AppConfig::default().with_controls(-2.0, 0.1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSetting {
                name: "movement_speed",
                ..
            })
        ));
    }
}
