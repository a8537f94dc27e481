//! OBJ/MTL model loading
//!
//! Geometry and materials are parsed with `tobj`; diffuse textures are
//! decoded with `image` through the [`MaterialLibrary`] cache. All sub-meshes
//! of a file are merged into a single indexed mesh.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use thiserror::Error;

use super::{
    model::{Mesh, Model},
    vertex::Vertex3D,
};
use crate::gfx::resources::material::{Material, MaterialLibrary};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to parse {path}: {source}")]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },
    #[error("{path} contains no triangles")]
    NoGeometry { path: PathBuf },
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("texture file not found: {path}")]
    MissingTexture { path: PathBuf },
    #[error("failed to decode texture {path}: {source}")]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("invalid texture '{label}': {reason}")]
    InvalidTexture { label: String, reason: String },
}

/// Vertex color used when a sub-mesh has no material.
const DEFAULT_VERTEX_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

/// Loads an OBJ file into a single [`Model`].
///
/// - Polygons are triangulated and every sub-mesh is appended to one mesh.
/// - Vertex colors come from the file when present, otherwise from the
///   sub-mesh material's diffuse color (white without a material).
/// - Missing normals are computed as smooth area-weighted normals.
/// - The model uses the material of the last sub-mesh that names one.
///   Texture paths are resolved relative to the OBJ's directory and a
///   referenced texture that cannot be found fails the load.
pub fn load_model(path: &Path, library: &mut MaterialLibrary) -> Result<Model, LoadError> {
    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )
    .map_err(|source| LoadError::Obj {
        path: path.to_path_buf(),
        source,
    })?;

    let materials = materials.unwrap_or_else(|err| {
        log::warn!("no usable MTL for {} ({}), using default material", path.display(), err);
        Vec::new()
    });

    if models.iter().all(|m| m.mesh.indices.is_empty()) {
        return Err(LoadError::NoGeometry {
            path: path.to_path_buf(),
        });
    }

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    let mut material_id = None;

    for model in &models {
        let mesh = &model.mesh;
        let base = vertices.len() as u32;

        let positions: Vec<[f32; 3]> = mesh
            .positions
            .chunks_exact(3)
            .map(|p| [p[0], p[1], p[2]])
            .collect();

        let normals: Vec<[f32; 3]> = if mesh.normals.len() == mesh.positions.len() {
            mesh.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect()
        } else {
            Mesh::calculate_normals(&positions, &mesh.indices)
        };

        let material_color = mesh
            .material_id
            .and_then(|id| materials.get(id))
            .and_then(|mtl| mtl.diffuse)
            .unwrap_or(DEFAULT_VERTEX_COLOR);
        let has_vertex_colors = mesh.vertex_color.len() == mesh.positions.len();

        for (i, position) in positions.iter().enumerate() {
            let color = if has_vertex_colors {
                [
                    mesh.vertex_color[i * 3],
                    mesh.vertex_color[i * 3 + 1],
                    mesh.vertex_color[i * 3 + 2],
                ]
            } else {
                material_color
            };
            let tex_coords = mesh
                .texcoords
                .get(i * 2..i * 2 + 2)
                .map(|t| [t[0], t[1]])
                .unwrap_or([0.0, 0.0]);

            vertices.push(Vertex3D::new(*position, color, normals[i], tex_coords));
        }

        indices.extend(mesh.indices.iter().map(|&index| index + base));

        if mesh.material_id.is_some() {
            material_id = mesh.material_id;
        }
    }

    let mesh = Mesh::new(vertices, indices)?;

    let material = match material_id.and_then(|id| materials.get(id)) {
        Some(mtl) => {
            let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
            let key = format!("{}#{}", path.display(), mtl.name);
            library.get_or_insert_material(&key, |library| {
                material_from_mtl(mtl, base_dir, library)
            })?
        }
        None => library.default_material(),
    };

    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    log::info!(
        "loaded model {} ({} vertices, {} indices, material '{}'{})",
        path.display(),
        mesh.vertices().len(),
        mesh.indices().len(),
        material.name,
        if material.uses_texture() { ", textured" } else { "" }
    );

    Ok(Model::new(&name, mesh, material))
}

fn material_from_mtl(
    mtl: &tobj::Material,
    base_dir: &Path,
    library: &mut MaterialLibrary,
) -> Result<Material, LoadError> {
    let defaults = Material::new(&mtl.name);
    let [ar, ag, ab] = mtl.ambient.unwrap_or(defaults.ambient);
    let [dr, dg, db] = mtl.diffuse.unwrap_or(defaults.diffuse);
    let [sr, sg, sb] = mtl.specular.unwrap_or(defaults.specular);

    let mut material = Material::new(&mtl.name)
        .with_ambient(ar, ag, ab)
        .with_diffuse(dr, dg, db)
        .with_specular(sr, sg, sb)
        .with_shininess(mtl.shininess.unwrap_or(defaults.shininess()));

    if let Some(texture) = mtl.diffuse_texture.as_deref().filter(|t| !t.is_empty()) {
        let texture: Arc<_> = library.load_texture(&base_dir.join(texture))?;
        material = material.with_texture(texture);
    }

    Ok(material)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct TempDir(PathBuf);

    impl TempDir {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!("thistle-loader-{}-{}", name, std::process::id()));
            fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }

        fn write(&self, file: &str, contents: &str) -> PathBuf {
            let path = self.0.join(file);
            fs::write(&path, contents).unwrap();
            path
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    const QUAD_OBJ: &str = "\
mtllib quad.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
usemtl red
f 1 2 3 4
";

    #[test]
    fn test_quad_is_triangulated_with_material_colors() {
        let dir = TempDir::new("quad");
        dir.write("quad.mtl", "newmtl red\nKa 0.1 0 0\nKd 1 0 0\nKs 0.5 0.5 0.5\nNs 64\n");
        let path = dir.write("quad.obj", QUAD_OBJ);

        let mut library = MaterialLibrary::new();
        let model = load_model(&path, &mut library).unwrap();

        assert_eq!(model.name, "quad");
        assert_eq!(model.mesh().triangle_count(), 2);
        assert!(model.mesh().vertices().iter().all(|v| v.color == [1.0, 0.0, 0.0]));
        // Computed normals face +z for a CCW quad in the xy plane.
        for vertex in model.mesh().vertices() {
            assert!((vertex.normal[2] - 1.0).abs() < 1e-5);
        }

        let material = model.material();
        assert_eq!(material.name, "red");
        assert_eq!(material.ambient, [0.1, 0.0, 0.0]);
        assert_eq!(material.shininess(), 64.0);
        assert!(!material.uses_texture());

        // Second load shares the cached material.
        let again = load_model(&path, &mut library).unwrap();
        assert!(Arc::ptr_eq(model.material(), again.material()));
    }

    #[test]
    fn test_missing_texture_fails_the_load() {
        let dir = TempDir::new("missing-tex");
        dir.write("quad.mtl", "newmtl red\nKd 1 0 0\nmap_Kd nowhere.png\n");
        let path = dir.write("quad.obj", QUAD_OBJ);

        let mut library = MaterialLibrary::new();
        let result = load_model(&path, &mut library);
        assert!(matches!(result, Err(LoadError::MissingTexture { .. })));
    }

    #[test]
    fn test_without_mtl_uses_default_material_and_white() {
        let dir = TempDir::new("no-mtl");
        let path = dir.write("tri.obj", "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");

        let mut library = MaterialLibrary::new();
        let model = load_model(&path, &mut library).unwrap();
        assert!(Arc::ptr_eq(model.material(), &library.default_material()));
        assert!(model.mesh().vertices().iter().all(|v| v.color == DEFAULT_VERTEX_COLOR));
        assert!(model.mesh().vertices().iter().all(|v| v.tex_coords == [0.0, 0.0]));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let mut library = MaterialLibrary::new();
        let result = load_model(Path::new("no/such/model.obj"), &mut library);
        assert!(matches!(result, Err(LoadError::Obj { .. })));
    }

    #[test]
    fn test_file_without_faces_has_no_geometry() {
        let dir = TempDir::new("empty");
        let path = dir.write("points.obj", "v 0 0 0\nv 1 0 0\n");
        let mut library = MaterialLibrary::new();
        assert!(matches!(
            load_model(&path, &mut library),
            Err(LoadError::NoGeometry { .. })
        ));
    }
}
