use super::camera_utils::{Camera, CameraMovement};
use crate::config::{CameraConfig, ConfigError};
use cgmath::*;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Pitch is kept strictly inside this many degrees of straight up/down.
pub const PITCH_LIMIT: f32 = 89.0;
pub const MIN_FOV: f32 = 1.0;
pub const MAX_FOV: f32 = 120.0;

/// First-person camera driven by yaw/pitch angles in degrees.
///
/// The forward/right/up basis is recomputed whenever yaw or pitch change;
/// the view and projection matrices are always derived from current state.
#[derive(Debug, Clone, Copy)]
pub struct FpsCamera {
    pub position: Vector3<f32>,
    yaw: f32,
    pitch: f32,
    fov: f32,
    aspect: f32,
    znear: f32,
    zfar: f32,
    world_up: Vector3<f32>,
    front: Vector3<f32>,
    right: Vector3<f32>,
    up: Vector3<f32>,
}

impl Camera for FpsCamera {
    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }
}

impl Default for FpsCamera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default(), 16.0 / 9.0)
    }
}

impl FpsCamera {
    pub fn new(position: Vector3<f32>, yaw: f32, pitch: f32, aspect: f32) -> Self {
        let mut camera = Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            fov: 45.0,
            aspect,
            znear: 0.1,
            zfar: 100.0,
            world_up: Vector3::unit_y(),
            front: -Vector3::unit_z(), // Will be recalculated in `update_vectors()`.
            right: Vector3::unit_x(),
            up: Vector3::unit_y(),
        };
        camera.set_orientation(yaw, pitch);
        camera
    }

    /// Builds a camera from the initial pose in `config`.
    ///
    /// Field of view is clamped to [`MIN_FOV`, `MAX_FOV`]; clip planes are
    /// taken as given, so validate the config first.
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self::new(
            Vector3::from(config.position),
            config.yaw,
            config.pitch,
            aspect,
        );
        camera.set_fov(config.fov);
        camera.znear = config.near;
        camera.zfar = config.far;
        camera
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn clip_planes(&self) -> (f32, f32) {
        (self.znear, self.zfar)
    }

    pub fn front(&self) -> Vector3<f32> {
        self.front
    }

    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    /// Moves along the camera's local axes, scaled by frame time.
    pub fn process_movement(&mut self, direction: CameraMovement, delta_time: f32, speed: f32) {
        let velocity = speed * delta_time;
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
            CameraMovement::Up => self.position += self.up * velocity,
            CameraMovement::Down => self.position -= self.up * velocity,
        }
    }

    /// Adds scaled mouse deltas to yaw (wrapping) and pitch (clamped).
    pub fn process_look(&mut self, delta_x: f32, delta_y: f32, sensitivity: f32) {
        self.yaw = wrap_degrees(self.yaw + delta_x * sensitivity);
        self.pitch = (self.pitch + delta_y * sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
    }

    /// Narrows the field of view for positive `delta` (scroll up).
    pub fn process_zoom(&mut self, delta: f32) {
        self.set_fov(self.fov - delta);
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov.clamp(MIN_FOV, MAX_FOV);
    }

    pub fn set_orientation(&mut self, yaw: f32, pitch: f32) {
        self.yaw = wrap_degrees(yaw);
        self.pitch = pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
    }

    pub fn set_clip_planes(&mut self, znear: f32, zfar: f32) -> Result<(), ConfigError> {
        if !(znear > 0.0) || !(zfar > znear) {
            return Err(ConfigError::InvalidClipPlanes {
                near: znear,
                far: zfar,
            });
        }
        self.znear = znear;
        self.zfar = zfar;
        Ok(())
    }

    /// Updates the aspect ratio after a viewport resize.
    pub fn set_aspect_ratio(&mut self, width: u32, height: u32) {
        let height = height.max(1); // Prevent division by zero
        self.aspect = width as f32 / height as f32;
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        let eye = Point3::from_vec(self.position);
        let target = Point3::from_vec(self.position + self.front);
        Matrix4::look_at_rh(eye, target, self.up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(Deg(self.fov), self.aspect, self.znear, self.zfar)
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vector3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

/// Wraps an angle in degrees into [-180, 180).
fn wrap_degrees(degrees: f32) -> f32 {
    (degrees + 180.0).rem_euclid(360.0) - 180.0
}
