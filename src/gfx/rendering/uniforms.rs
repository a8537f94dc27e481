//! Shader uniform names and their byte layout
//!
//! The Phong shader declares two uniform structs: a per-frame block
//! (group 0) and a per-object block (group 1, bound with a dynamic offset).
//! [`UniformLayout`] maps every uniform name to its block, byte offset and
//! kind so values can be written by name, the same way a GL program would
//! look up uniform locations. [`UniformStaging`] holds the CPU copies of both
//! blocks plus the texture bound for the next draw.

use std::{collections::HashMap, sync::Arc};

use cgmath::{Matrix3, Matrix4};

use super::binding::{BindingError, UniformSink};
use crate::gfx::{
    camera::camera_utils::{convert_matrix3_to_padded_array, convert_matrix4_to_array},
    resources::texture_resource::TextureImage,
};

pub const MODEL: &str = "model";
pub const NORMAL_MATRIX: &str = "normalMatrix";
pub const VIEW: &str = "view";
pub const PROJECTION: &str = "projection";
pub const VIEW_POS: &str = "viewPos";

pub const MATERIAL_AMBIENT: &str = "material.ambient";
pub const MATERIAL_DIFFUSE: &str = "material.diffuse";
pub const MATERIAL_SPECULAR: &str = "material.specular";
pub const MATERIAL_SHININESS: &str = "material.shininess";
pub const MATERIAL_USE_TEXTURE: &str = "material.useTexture";

pub const LIGHT_POSITION: &str = "light.position";
pub const LIGHT_AMBIENT: &str = "light.ambient";
pub const LIGHT_DIFFUSE: &str = "light.diffuse";
pub const LIGHT_SPECULAR: &str = "light.specular";

/// Diffuse texture + sampler pair (group 2).
pub const DIFFUSE_TEXTURE: &str = "texture_diffuse1";
pub const DIFFUSE_TEXTURE_UNIT: u32 = 0;

/// Size of the `FrameUniforms` WGSL struct.
pub const FRAME_BLOCK_SIZE: usize = 208;
/// Size of the `ObjectUniforms` WGSL struct.
pub const OBJECT_BLOCK_SIZE: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformBlock {
    Frame,
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Mat4,
    /// Stored as three 16-byte columns.
    Mat3,
    Vec3,
    Float,
    /// Stored as a `u32`.
    Bool,
}

/// A value written to a named uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Mat4(Matrix4<f32>),
    Mat3(Matrix3<f32>),
    Vec3([f32; 3]),
    Float(f32),
    Bool(bool),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Mat4(_) => UniformKind::Mat4,
            UniformValue::Mat3(_) => UniformKind::Mat3,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Bool(_) => UniformKind::Bool,
        }
    }

    fn write_to(&self, bytes: &mut [u8]) {
        match self {
            UniformValue::Mat4(m) => {
                bytes[..64].copy_from_slice(bytemuck::cast_slice(&convert_matrix4_to_array(*m)))
            }
            UniformValue::Mat3(m) => bytes[..48]
                .copy_from_slice(bytemuck::cast_slice(&convert_matrix3_to_padded_array(*m))),
            UniformValue::Vec3(v) => bytes[..12].copy_from_slice(bytemuck::cast_slice(v)),
            UniformValue::Float(f) => bytes[..4].copy_from_slice(&f.to_ne_bytes()),
            UniformValue::Bool(b) => bytes[..4].copy_from_slice(&(*b as u32).to_ne_bytes()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    pub block: UniformBlock,
    pub offset: usize,
    pub kind: UniformKind,
}

/// Name -> slot table for one shader program
#[derive(Debug, Clone)]
pub struct UniformLayout {
    slots: HashMap<&'static str, UniformSlot>,
    textures: Vec<&'static str>,
}

impl UniformLayout {
    /// Layout of the Phong shaders.
    pub fn phong() -> Self {
        use UniformBlock::{Frame, Object};
        use UniformKind::*;

        #[rustfmt::skip]
        let slots = [
            (VIEW,                 Frame,  0,   Mat4),
            (PROJECTION,           Frame,  64,  Mat4),
            (VIEW_POS,             Frame,  128, Vec3),
            (LIGHT_POSITION,       Frame,  144, Vec3),
            (LIGHT_AMBIENT,        Frame,  160, Vec3),
            (LIGHT_DIFFUSE,        Frame,  176, Vec3),
            (LIGHT_SPECULAR,       Frame,  192, Vec3),
            (MODEL,                Object, 0,   Mat4),
            (NORMAL_MATRIX,        Object, 64,  Mat3),
            (MATERIAL_AMBIENT,     Object, 112, Vec3),
            (MATERIAL_SHININESS,   Object, 124, Float),
            (MATERIAL_DIFFUSE,     Object, 128, Vec3),
            (MATERIAL_USE_TEXTURE, Object, 140, Bool),
            (MATERIAL_SPECULAR,    Object, 144, Vec3),
        ];

        Self {
            slots: slots
                .into_iter()
                .map(|(name, block, offset, kind)| (name, UniformSlot { block, offset, kind }))
                .collect(),
            textures: vec![DIFFUSE_TEXTURE],
        }
    }

    /// Drops a uniform, as if the shader never declared it.
    pub fn without(mut self, name: &str) -> Self {
        self.slots.remove(name);
        self.textures.retain(|texture| *texture != name);
        self
    }

    pub fn slot(&self, name: &str) -> Option<&UniformSlot> {
        self.slots.get(name)
    }

    pub fn has_texture(&self, name: &str) -> bool {
        self.textures.iter().any(|texture| *texture == name)
    }

    pub fn block_size(block: UniformBlock) -> usize {
        match block {
            UniformBlock::Frame => FRAME_BLOCK_SIZE,
            UniformBlock::Object => OBJECT_BLOCK_SIZE,
        }
    }
}

/// CPU copies of the uniform blocks, written by name
#[derive(Debug, Clone)]
pub struct UniformStaging {
    layout: UniformLayout,
    frame: Vec<u8>,
    object: Vec<u8>,
    texture: Option<Arc<TextureImage>>,
}

impl UniformStaging {
    pub fn new(layout: UniformLayout) -> Self {
        Self {
            layout,
            frame: vec![0; FRAME_BLOCK_SIZE],
            object: vec![0; OBJECT_BLOCK_SIZE],
            texture: None,
        }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn frame_block(&self) -> &[u8] {
        &self.frame
    }

    pub fn object_block(&self) -> &[u8] {
        &self.object
    }

    /// Texture bound to the diffuse unit, `None` when unbound.
    pub fn bound_texture(&self) -> Option<&Arc<TextureImage>> {
        self.texture.as_ref()
    }
}

impl UniformSink for UniformStaging {
    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), BindingError> {
        let slot = *self
            .layout
            .slot(name)
            .ok_or_else(|| BindingError::UnknownUniform(name.to_string()))?;

        if slot.kind != value.kind() {
            return Err(BindingError::TypeMismatch {
                name: name.to_string(),
                expected: slot.kind,
                actual: value.kind(),
            });
        }

        let block = match slot.block {
            UniformBlock::Frame => &mut self.frame,
            UniformBlock::Object => &mut self.object,
        };
        value.write_to(&mut block[slot.offset..]);
        Ok(())
    }

    fn bind_texture(
        &mut self,
        name: &str,
        unit: u32,
        texture: &Arc<TextureImage>,
    ) -> Result<(), BindingError> {
        if unit != DIFFUSE_TEXTURE_UNIT || !self.layout.has_texture(name) {
            return Err(BindingError::UnknownUniform(name.to_string()));
        }
        self.texture = Some(texture.clone());
        Ok(())
    }

    fn unbind_texture(&mut self, unit: u32) {
        if unit == DIFFUSE_TEXTURE_UNIT {
            self.texture = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::SquareMatrix;

    fn read_f32(bytes: &[u8], offset: usize) -> f32 {
        f32::from_ne_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn test_slots_fit_inside_their_blocks() {
        let layout = UniformLayout::phong();
        for (name, slot) in &layout.slots {
            let size = match slot.kind {
                UniformKind::Mat4 => 64,
                UniformKind::Mat3 => 48,
                UniformKind::Vec3 => 12,
                UniformKind::Float | UniformKind::Bool => 4,
            };
            assert!(
                slot.offset + size <= UniformLayout::block_size(slot.block),
                "{} overflows its block",
                name
            );
        }
    }

    #[test]
    fn test_values_land_at_their_offsets() {
        let mut staging = UniformStaging::new(UniformLayout::phong());
        staging
            .set_uniform(MATERIAL_DIFFUSE, UniformValue::Vec3([0.5, 0.25, 1.0]))
            .unwrap();
        staging
            .set_uniform(MATERIAL_SHININESS, UniformValue::Float(32.0))
            .unwrap();
        staging
            .set_uniform(MATERIAL_USE_TEXTURE, UniformValue::Bool(true))
            .unwrap();
        staging
            .set_uniform(VIEW_POS, UniformValue::Vec3([1.0, 2.0, 3.0]))
            .unwrap();

        let object = staging.object_block();
        assert_eq!(read_f32(object, 128), 0.5);
        assert_eq!(read_f32(object, 132), 0.25);
        assert_eq!(read_f32(object, 136), 1.0);
        assert_eq!(read_f32(object, 124), 32.0);
        assert_eq!(u32::from_ne_bytes(object[140..144].try_into().unwrap()), 1);
        assert_eq!(read_f32(staging.frame_block(), 136), 3.0);
    }

    #[test]
    fn test_normal_matrix_columns_are_padded() {
        let mut staging = UniformStaging::new(UniformLayout::phong());
        staging
            .set_uniform(NORMAL_MATRIX, UniformValue::Mat3(Matrix3::identity()))
            .unwrap();
        let object = staging.object_block();
        assert_eq!(read_f32(object, 64), 1.0);
        assert_eq!(read_f32(object, 64 + 16 + 4), 1.0);
        assert_eq!(read_f32(object, 64 + 32 + 8), 1.0);
        assert_eq!(read_f32(object, 64 + 12), 0.0);
    }

    #[test]
    fn test_unknown_and_mistyped_uniforms_are_rejected() {
        let mut staging = UniformStaging::new(UniformLayout::phong().without(MATERIAL_SPECULAR));
        assert_eq!(
            staging.set_uniform(MATERIAL_SPECULAR, UniformValue::Vec3([1.0; 3])),
            Err(BindingError::UnknownUniform(MATERIAL_SPECULAR.into()))
        );
        assert!(matches!(
            staging.set_uniform(MODEL, UniformValue::Float(1.0)),
            Err(BindingError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_texture_binding_and_unbinding() {
        let mut staging = UniformStaging::new(UniformLayout::phong());
        let texture = Arc::new(TextureImage::solid_color("white", [1.0; 3]));
        staging
            .bind_texture(DIFFUSE_TEXTURE, DIFFUSE_TEXTURE_UNIT, &texture)
            .unwrap();
        assert!(staging.bound_texture().is_some());
        staging.unbind_texture(DIFFUSE_TEXTURE_UNIT);
        assert!(staging.bound_texture().is_none());

        assert!(staging.bind_texture("normal_map", 1, &texture).is_err());
    }
}
