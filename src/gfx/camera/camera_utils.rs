use cgmath::{Matrix3, Matrix4};

/// Direction of a camera move along its local axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

impl CameraMovement {
    pub const ALL: [CameraMovement; 6] = [
        CameraMovement::Forward,
        CameraMovement::Backward,
        CameraMovement::Left,
        CameraMovement::Right,
        CameraMovement::Up,
        CameraMovement::Down,
    ];
}

pub trait Camera: Sized {
    fn build_view_projection_matrix(&self) -> Matrix4<f32>;
}

pub fn convert_matrix4_to_array(matrix4: Matrix4<f32>) -> [[f32; 4]; 4] {
    matrix4.into()
}

/// Converts a 3x3 matrix into three columns padded to vec4, the WGSL
/// `mat3x3<f32>` uniform layout.
pub fn convert_matrix3_to_padded_array(matrix3: Matrix3<f32>) -> [[f32; 4]; 3] {
    let mut result = [[0.0; 4]; 3];

    for i in 0..3 {
        for j in 0..3 {
            result[i][j] = matrix3[i][j];
        }
    }

    result
}
