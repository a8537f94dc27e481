//! CPU reference of the Phong fragment shader.
//!
//! Mirrors `phong_frag.wgsl` term for term so the lighting model can be checked
//! without a GPU.

use cgmath::{InnerSpace, Vector3};

use crate::gfx::resources::{global_bindings::Light, material::Material};

/// Interpolated inputs of one fragment, in world space.
#[derive(Debug, Clone, Copy)]
pub struct Fragment {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub vertex_color: [f32; 3],
    pub tex_coords: [f32; 2],
}

/// Shades one fragment: ambient + Lambert diffuse + Phong specular.
///
/// The base color is the material's texture sampled at `tex_coords`, or the
/// vertex color for vertex-colored materials. It scales the ambient and
/// diffuse terms; specular is untinted.
pub fn shade(material: &Material, light: &Light, view_pos: Vector3<f32>, fragment: &Fragment) -> [f32; 3] {
    let base = match material.texture() {
        Some(texture) => texture.sample(fragment.tex_coords),
        None => fragment.vertex_color,
    };

    let normal = fragment.normal.normalize();
    let light_dir = (Vector3::from(light.position) - fragment.position).normalize();
    let diff = normal.dot(light_dir).max(0.0);

    let view_dir = (view_pos - fragment.position).normalize();
    let reflect_dir = reflect(-light_dir, normal);
    let spec = view_dir.dot(reflect_dir).max(0.0).powf(material.shininess());

    let mut color = [0.0; 3];
    for i in 0..3 {
        let ambient = light.ambient[i] * material.ambient[i] * base[i];
        let diffuse = light.diffuse[i] * diff * material.diffuse[i] * base[i];
        let specular = light.specular[i] * spec * material.specular[i];
        color[i] = ambient + diffuse + specular;
    }
    color
}

fn reflect(incident: Vector3<f32>, normal: Vector3<f32>) -> Vector3<f32> {
    incident - normal * (2.0 * normal.dot(incident))
}
