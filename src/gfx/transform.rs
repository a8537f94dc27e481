//! Object transforms
//!
//! A [`Transform`] stores position, Euler rotation and per-axis scale and
//! derives the model matrix on demand. Nothing is cached: the matrix is
//! rebuilt from the current fields every time it is asked for, so a
//! transform mutated between frames is always drawn where it now is.
//!
//! ## Rotation order
//!
//! `rotation` holds degrees about the X, Y and Z axes. The rotation block is
//! `Rz * Ry * Rx`: a vertex is rotated about X first, then Y, then Z.

use cgmath::{Deg, InnerSpace, Matrix, Matrix3, Matrix4, SquareMatrix, Vector3};
use thiserror::Error;

/// Determinant, relative to the product of the column lengths, below which
/// the 3x3 block is treated as singular. Scale independent: a uniform scale
/// of 0.001 is as well conditioned as a scale of 1.
pub const DEGENERATE_EPSILON: f32 = 1e-6;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum TransformError {
    /// The rotation/scale block cannot be inverted (an axis collapsed to zero).
    #[error("degenerate transform: rotation/scale block has determinant {determinant}")]
    DegenerateTransform { determinant: f32 },
}

/// Position, rotation (Euler degrees) and scale of one scene object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: Vector3<f32>,
    pub scale: Vector3<f32>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn from_position(position: Vector3<f32>) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    /// Builder: set the position
    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Vector3::new(x, y, z);
        self
    }

    /// Builder: set rotation in degrees about X, Y and Z
    pub fn with_rotation(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = Vector3::new(x, y, z);
        self
    }

    /// Builder: set the same scale on every axis
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vector3::new(scale, scale, scale);
        self
    }

    /// Builder: set per-axis scale
    pub fn with_scale(mut self, x: f32, y: f32, z: f32) -> Self {
        self.scale = Vector3::new(x, y, z);
        self
    }

    /// Move by `delta` in world space
    pub fn translate(&mut self, delta: Vector3<f32>) {
        self.position += delta;
    }

    /// Add `delta` degrees to the Euler rotation
    pub fn rotate(&mut self, delta: Vector3<f32>) {
        self.rotation += delta;
    }

    /// True when any scale component is not strictly positive.
    pub fn has_invalid_scale(&self) -> bool {
        !(self.scale.x > 0.0 && self.scale.y > 0.0 && self.scale.z > 0.0)
    }

    /// Rotation block `Rz * Ry * Rx` as a 4x4 matrix.
    pub fn rotation_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_angle_z(Deg(self.rotation.z))
            * Matrix4::from_angle_y(Deg(self.rotation.y))
            * Matrix4::from_angle_x(Deg(self.rotation.x))
    }

    /// Model matrix: `Translate * Rotate * Scale`.
    pub fn compose(&self) -> Matrix4<f32> {
        let t = Matrix4::from_translation(self.position);
        let s = Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z);
        t * self.rotation_matrix() * s // Order matters: T * R * S
    }
}

/// Upper-left 3x3 block of a 4x4 matrix.
pub fn upper_left_3x3(model: &Matrix4<f32>) -> Matrix3<f32> {
    Matrix3::from_cols(model.x.truncate(), model.y.truncate(), model.z.truncate())
}

/// Inverse-transpose of the model matrix's rotation/scale block.
///
/// Keeps normals perpendicular to their surface under non-uniform scale.
/// Returns [`TransformError::DegenerateTransform`] instead of a silently
/// wrong matrix when the block is not invertible.
pub fn normal_matrix(model: &Matrix4<f32>) -> Result<Matrix3<f32>, TransformError> {
    let block = upper_left_3x3(model);
    let determinant = block.determinant();
    let volume = block.x.magnitude() * block.y.magnitude() * block.z.magnitude();

    // |det| <= volume always; the ratio is 1 for orthogonal axes.
    if !determinant.is_finite() || !(determinant.abs() > DEGENERATE_EPSILON * volume) {
        return Err(TransformError::DegenerateTransform { determinant });
    }

    let inverse = block
        .invert()
        .ok_or(TransformError::DegenerateTransform { determinant })?;
    let entries: &[f32; 9] = inverse.as_ref();
    if entries.iter().any(|e| !e.is_finite()) {
        return Err(TransformError::DegenerateTransform { determinant });
    }
    Ok(inverse.transpose())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector4;

    fn assert_mat3_close(a: Matrix3<f32>, b: Matrix3<f32>) {
        let a: &[f32; 9] = a.as_ref();
        let b: &[f32; 9] = b.as_ref();
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-4, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn test_identity_composes_to_identity() {
        assert_eq!(Transform::identity().compose(), Matrix4::identity());
    }

    #[test]
    fn test_compose_applies_scale_then_rotation_then_translation() {
        let transform = Transform::identity()
            .with_position(1.0, 2.0, 3.0)
            .with_rotation(0.0, 0.0, 90.0)
            .with_uniform_scale(2.0);

        // (1,0,0) -> scale (2,0,0) -> rotate about z (0,2,0) -> translate (1,4,3)
        let p = transform.compose() * Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert!((p.x - 1.0).abs() < 1e-5);
        assert!((p.y - 4.0).abs() < 1e-5);
        assert!((p.z - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_rotation_order_is_x_then_y_then_z() {
        let transform = Transform::identity().with_rotation(90.0, 90.0, 0.0);
        // Rx(90) takes +y to +z, then Ry(90) takes +z to +x.
        let v = transform.compose() * Vector4::new(0.0, 1.0, 0.0, 0.0);
        assert!((v.x - 1.0).abs() < 1e-5);
        assert!(v.y.abs() < 1e-5);
        assert!(v.z.abs() < 1e-5);
    }

    #[test]
    fn test_compose_is_invertible_and_normal_matrix_matches_inverse_transpose() {
        let samples = [
            ((0.0, 0.0, 0.0), (0.0, 0.0, 0.0), (1.0, 1.0, 1.0)),
            ((5.0, -3.0, 2.0), (45.0, -30.0, 359.0), (2.0, 0.5, 1.0)),
            ((-1.0, 8.0, 0.5), (-359.0, 120.0, -75.0), (0.1, 3.0, 7.5)),
            ((0.0, 0.0, -10.0), (180.0, 90.0, 270.0), (1.0, 1.0, 0.25)),
        ];

        for (p, r, s) in samples {
            let transform = Transform::identity()
                .with_position(p.0, p.1, p.2)
                .with_rotation(r.0, r.1, r.2)
                .with_scale(s.0, s.1, s.2);
            let model = transform.compose();
            assert!(model.invert().is_some());

            let expected = upper_left_3x3(&model).invert().unwrap().transpose();
            assert_mat3_close(normal_matrix(&model).unwrap(), expected);
        }
    }

    #[test]
    fn test_normal_matrix_keeps_normals_perpendicular_under_nonuniform_scale() {
        let transform = Transform::identity().with_scale(4.0, 1.0, 1.0);
        let model = transform.compose();

        // Surface tangent along (1,1,0) with normal (1,-1,0).
        let tangent = upper_left_3x3(&model) * Vector3::new(1.0, 1.0, 0.0);
        let normal = normal_matrix(&model).unwrap() * Vector3::new(1.0, -1.0, 0.0);
        assert!(tangent.dot(normal).abs() < 1e-5);
    }

    #[test]
    fn test_zero_scale_reports_degenerate_transform() {
        for scale in [(0.0, 1.0, 1.0), (1.0, 0.0, 1.0), (1.0, 1.0, 0.0)] {
            let transform = Transform::identity().with_scale(scale.0, scale.1, scale.2);
            assert!(transform.has_invalid_scale());
            assert!(matches!(
                normal_matrix(&transform.compose()),
                Err(TransformError::DegenerateTransform { .. })
            ));
        }
    }

    #[test]
    fn test_small_uniform_scale_is_not_degenerate() {
        for scale in [0.005, 0.001] {
            let transform = Transform::identity()
                .with_rotation(0.0, 90.0, 0.0)
                .with_uniform_scale(scale);
            let model = transform.compose();
            assert!(!transform.has_invalid_scale());

            let expected = upper_left_3x3(&model).invert().unwrap().transpose();
            let normal = normal_matrix(&model).unwrap();
            let (a, b): (&[f32; 9], &[f32; 9]) = (normal.as_ref(), expected.as_ref());
            for (x, y) in a.iter().zip(b.iter()) {
                assert!((x - y).abs() <= 1e-4 * y.abs().max(1.0), "{:?} != {:?}", a, b);
            }

            // The rotation survives: a +x normal now points along -z.
            let n = (normal * Vector3::new(1.0, 0.0, 0.0)).normalize();
            assert!((n.z + 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_collapsed_axis_from_rotation_is_degenerate() {
        // Two identical columns: rank 2 at any scale.
        let block = Matrix3::from_cols(
            Vector3::new(0.001, 0.0, 0.0),
            Vector3::new(0.001, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 0.001),
        );
        let model = Matrix4::from(block);
        assert!(normal_matrix(&model).is_err());
    }

    #[test]
    fn test_mutation_is_reflected_in_next_compose() {
        let mut transform = Transform::identity();
        let before = transform.compose();
        transform.translate(Vector3::new(0.0, 2.0, 0.0));
        let after = transform.compose();
        assert_ne!(before, after);
        assert_eq!(after.w.y, 2.0);
    }
}
