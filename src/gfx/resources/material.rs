//! Material system for Phong shading
//!
//! A [`Material`] carries ambient/diffuse/specular colors, a shininess
//! exponent and a [`ColorSource`] that decides where the surface's base
//! color comes from: the mesh's per-vertex colors or a diffuse texture.
//! Materials and textures are shared through `Arc`; [`MaterialLibrary`]
//! keeps one instance per material name and per texture path so that many
//! models can reference the same pair.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::gfx::{resources::texture_resource::TextureImage, scene::loader::LoadError};

/// Lowest accepted shininess exponent; smaller values are raised to it.
pub const MIN_SHININESS: f32 = 1.0;

/// Material ID for referencing materials in a [`MaterialLibrary`]
pub type MaterialId = String;

/// Where a material takes its base surface color from
#[derive(Debug, Clone)]
pub enum ColorSource {
    /// Interpolated per-vertex color.
    VertexColor,
    /// Diffuse texture sampled at the vertex texture coordinates.
    Texture(Arc<TextureImage>),
}

/// Phong material definition
///
/// Color components are conventionally in [0, 1] but are not clamped.
/// Shininess is clamped to at least [`MIN_SHININESS`].
#[derive(Debug, Clone)]
pub struct Material {
    pub name: String,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    shininess: f32,
    pub color_source: ColorSource,
}

impl Default for Material {
    fn default() -> Self {
        Self::new("Default")
    }
}

impl Material {
    /// Creates a vertex-colored material with default Phong coefficients
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ambient: [0.2, 0.2, 0.2],
            diffuse: [0.8, 0.8, 0.8],
            specular: [1.0, 1.0, 1.0],
            shininess: 32.0,
            color_source: ColorSource::VertexColor,
        }
    }

    /// Builder pattern: Set ambient color
    pub fn with_ambient(mut self, r: f32, g: f32, b: f32) -> Self {
        self.ambient = [r, g, b];
        self
    }

    /// Builder pattern: Set diffuse color
    pub fn with_diffuse(mut self, r: f32, g: f32, b: f32) -> Self {
        self.diffuse = [r, g, b];
        self
    }

    /// Builder pattern: Set specular color
    pub fn with_specular(mut self, r: f32, g: f32, b: f32) -> Self {
        self.specular = [r, g, b];
        self
    }

    /// Builder pattern: Set shininess exponent
    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.set_shininess(shininess);
        self
    }

    /// Builder pattern: Sample base color from a diffuse texture
    pub fn with_texture(mut self, texture: Arc<TextureImage>) -> Self {
        self.color_source = ColorSource::Texture(texture);
        self
    }

    pub fn shininess(&self) -> f32 {
        self.shininess
    }

    pub fn set_shininess(&mut self, shininess: f32) {
        self.shininess = if shininess.is_nan() {
            MIN_SHININESS
        } else {
            shininess.max(MIN_SHININESS)
        };
    }

    pub fn uses_texture(&self) -> bool {
        matches!(self.color_source, ColorSource::Texture(_))
    }

    pub fn texture(&self) -> Option<&Arc<TextureImage>> {
        match &self.color_source {
            ColorSource::Texture(texture) => Some(texture),
            ColorSource::VertexColor => None,
        }
    }
}

/// Shared storage for materials and the textures they reference
///
/// Materials are keyed by an ID chosen by the caller (the loader uses
/// `"<obj path>#<material name>"`); textures are keyed by file path.
pub struct MaterialLibrary {
    materials: HashMap<MaterialId, Arc<Material>>,
    textures: HashMap<PathBuf, Arc<TextureImage>>,
    default_material: Arc<Material>,
}

impl Default for MaterialLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialLibrary {
    /// Creates a new library holding only the default material
    pub fn new() -> Self {
        Self {
            materials: HashMap::new(),
            textures: HashMap::new(),
            default_material: Arc::new(Material::default()),
        }
    }

    /// Adds or replaces a material, returning the shared handle
    pub fn add_material(&mut self, id: &str, material: Material) -> Arc<Material> {
        let material = Arc::new(material);
        self.materials.insert(id.to_string(), material.clone());
        material
    }

    pub fn get_material(&self, id: &str) -> Option<Arc<Material>> {
        self.materials.get(id).cloned()
    }

    /// Returns the cached material for `id`, building it on first request
    pub fn get_or_insert_material<F>(&mut self, id: &str, build: F) -> Result<Arc<Material>, LoadError>
    where
        F: FnOnce(&mut Self) -> Result<Material, LoadError>,
    {
        if let Some(material) = self.materials.get(id) {
            return Ok(material.clone());
        }
        let material = build(self)?;
        Ok(self.add_material(id, material))
    }

    pub fn default_material(&self) -> Arc<Material> {
        self.default_material.clone()
    }

    /// Loads a texture file once; later requests for the same path share it
    pub fn load_texture(&mut self, path: &Path) -> Result<Arc<TextureImage>, LoadError> {
        if let Some(texture) = self.textures.get(path) {
            return Ok(texture.clone());
        }

        let texture = Arc::new(TextureImage::open(path)?);
        log::info!(
            "loaded texture {} ({}x{})",
            path.display(),
            texture.dimensions().0,
            texture.dimensions().1
        );
        self.textures.insert(path.to_path_buf(), texture.clone());
        Ok(texture)
    }

    /// Lists all material IDs
    pub fn list_materials(&self) -> Vec<&MaterialId> {
        self.materials.keys().collect()
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shininess_is_clamped_to_minimum() {
        assert_eq!(Material::new("m").with_shininess(0.0).shininess(), MIN_SHININESS);
        assert_eq!(Material::new("m").with_shininess(-5.0).shininess(), MIN_SHININESS);
        assert_eq!(Material::new("m").with_shininess(f32::NAN).shininess(), MIN_SHININESS);
        assert_eq!(Material::new("m").with_shininess(64.0).shininess(), 64.0);
    }

    #[test]
    fn test_colors_are_not_clamped() {
        let material = Material::new("hdr").with_diffuse(2.0, -0.5, 1.0);
        assert_eq!(material.diffuse, [2.0, -0.5, 1.0]);
    }

    #[test]
    fn test_color_source_variants() {
        let plain = Material::new("plain");
        assert!(!plain.uses_texture());
        assert!(plain.texture().is_none());

        let texture = Arc::new(TextureImage::solid_color("white", [1.0; 3]));
        let textured = Material::new("textured").with_texture(texture.clone());
        assert!(textured.uses_texture());
        assert!(Arc::ptr_eq(textured.texture().unwrap(), &texture));
    }

    #[test]
    fn test_library_shares_materials() {
        let mut library = MaterialLibrary::new();
        let mut builds = 0;
        let a = library
            .get_or_insert_material("cube.obj#red", |_| {
                builds += 1;
                Ok(Material::new("red"))
            })
            .unwrap();
        let b = library
            .get_or_insert_material("cube.obj#red", |_| {
                builds += 1;
                Ok(Material::new("red"))
            })
            .unwrap();
        assert_eq!(builds, 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(library.list_materials().len(), 1);
    }

    #[test]
    fn test_library_reports_missing_texture() {
        let mut library = MaterialLibrary::new();
        let result = library.load_texture(Path::new("missing/brick.png"));
        assert!(matches!(result, Err(LoadError::MissingTexture { .. })));
        assert_eq!(library.texture_count(), 0);
    }
}
