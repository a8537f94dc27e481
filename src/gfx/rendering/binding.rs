//! Material and transform binding onto a shader program
//!
//! [`UniformSink`] is the seam between the frame loop and the GPU: anything
//! that accepts named uniform writes and texture binds. The wgpu backend
//! implements it through [`UniformStaging`], tests implement it with a
//! recording mock.
//!
//! [`UniformBinder`] writes materials, transforms and frame globals by name.
//! A name the shader does not declare is skipped and reported once; it never
//! aborts the frame.
//!
//! [`UniformStaging`]: super::uniforms::UniformStaging

use std::{collections::HashSet, sync::Arc};

use cgmath::{Matrix3, Matrix4, Vector3};
use thiserror::Error;

use super::uniforms::{self, UniformKind, UniformValue, DIFFUSE_TEXTURE, DIFFUSE_TEXTURE_UNIT};
use crate::gfx::resources::{
    global_bindings::Light,
    material::{ColorSource, Material},
    texture_resource::TextureImage,
};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BindingError {
    #[error("shader has no uniform named '{0}'")]
    UnknownUniform(String),
    #[error("uniform '{name}' is {expected:?}, got {actual:?}")]
    TypeMismatch {
        name: String,
        expected: UniformKind,
        actual: UniformKind,
    },
}

/// Receiver of named uniform writes for the active shader program
pub trait UniformSink {
    fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), BindingError>;

    fn bind_texture(
        &mut self,
        name: &str,
        unit: u32,
        texture: &Arc<TextureImage>,
    ) -> Result<(), BindingError>;

    /// Clears whatever texture is bound to `unit`.
    fn unbind_texture(&mut self, unit: u32);
}

/// Writes engine state into a [`UniformSink`], absorbing binding failures
#[derive(Debug, Default)]
pub struct UniformBinder {
    reported: HashSet<String>,
}

impl UniformBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names that failed to bind so far.
    pub fn reported(&self) -> impl Iterator<Item = &str> {
        self.reported.iter().map(String::as_str)
    }

    fn set<S: UniformSink + ?Sized>(&mut self, sink: &mut S, name: &str, value: UniformValue) -> bool {
        match sink.set_uniform(name, value) {
            Ok(()) => true,
            Err(err) => {
                self.report(name, err);
                false
            }
        }
    }

    fn report(&mut self, name: &str, err: BindingError) {
        if self.reported.insert(name.to_string()) {
            log::warn!("{}; skipping it", err);
        }
    }

    /// View, projection, camera position and light parameters.
    pub fn set_frame_globals<S: UniformSink + ?Sized>(
        &mut self,
        sink: &mut S,
        view: Matrix4<f32>,
        projection: Matrix4<f32>,
        view_pos: Vector3<f32>,
        light: &Light,
    ) {
        self.set(sink, uniforms::VIEW, UniformValue::Mat4(view));
        self.set(sink, uniforms::PROJECTION, UniformValue::Mat4(projection));
        self.set(sink, uniforms::VIEW_POS, UniformValue::Vec3(view_pos.into()));
        self.set(sink, uniforms::LIGHT_POSITION, UniformValue::Vec3(light.position));
        self.set(sink, uniforms::LIGHT_AMBIENT, UniformValue::Vec3(light.ambient));
        self.set(sink, uniforms::LIGHT_DIFFUSE, UniformValue::Vec3(light.diffuse));
        self.set(sink, uniforms::LIGHT_SPECULAR, UniformValue::Vec3(light.specular));
    }

    pub fn set_object_transform<S: UniformSink + ?Sized>(
        &mut self,
        sink: &mut S,
        model: Matrix4<f32>,
        normal: Matrix3<f32>,
    ) {
        self.set(sink, uniforms::MODEL, UniformValue::Mat4(model));
        self.set(sink, uniforms::NORMAL_MATRIX, UniformValue::Mat3(normal));
    }

    /// Writes every material field and selects the color source.
    ///
    /// A vertex-colored material unbinds the diffuse unit, so a texture left
    /// by a previous draw can never bleed into this one. If a textured
    /// material's texture cannot be bound, `useTexture` is forced off and the
    /// draw falls back to vertex colors.
    pub fn bind_material<S: UniformSink + ?Sized>(&mut self, sink: &mut S, material: &Material) {
        self.set(sink, uniforms::MATERIAL_AMBIENT, UniformValue::Vec3(material.ambient));
        self.set(sink, uniforms::MATERIAL_DIFFUSE, UniformValue::Vec3(material.diffuse));
        self.set(sink, uniforms::MATERIAL_SPECULAR, UniformValue::Vec3(material.specular));
        self.set(
            sink,
            uniforms::MATERIAL_SHININESS,
            UniformValue::Float(material.shininess()),
        );

        let use_texture = match &material.color_source {
            ColorSource::Texture(texture) => {
                match sink.bind_texture(DIFFUSE_TEXTURE, DIFFUSE_TEXTURE_UNIT, texture) {
                    Ok(()) => true,
                    Err(err) => {
                        self.report(DIFFUSE_TEXTURE, err);
                        sink.unbind_texture(DIFFUSE_TEXTURE_UNIT);
                        false
                    }
                }
            }
            ColorSource::VertexColor => {
                sink.unbind_texture(DIFFUSE_TEXTURE_UNIT);
                false
            }
        };
        self.set(sink, uniforms::MATERIAL_USE_TEXTURE, UniformValue::Bool(use_texture));
    }
}
