use std::sync::{Arc, OnceLock};

use wgpu::util::DeviceExt;

use super::{loader::LoadError, vertex::Vertex3D};
use crate::gfx::resources::material::Material;

/// Indexed triangle mesh, immutable once built.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<Vertex3D>,
    indices: Vec<u32>,
}

impl Mesh {
    /// Builds a mesh, checking that the indices describe whole triangles
    /// that all reference existing vertices.
    pub fn new(vertices: Vec<Vertex3D>, indices: Vec<u32>) -> Result<Self, LoadError> {
        if indices.len() % 3 != 0 {
            return Err(LoadError::InvalidGeometry(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(LoadError::InvalidGeometry(format!(
                "index {} out of range for {} vertices",
                bad,
                vertices.len()
            )));
        }

        Ok(Self { vertices, indices })
    }

    pub fn vertices(&self) -> &[Vertex3D] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    // Smooth normals for meshes whose file did not provide any
    pub fn calculate_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
        let mut normals = vec![[0.0f32; 3]; positions.len()];

        for triangle in indices.chunks_exact(3) {
            let (i0, i1, i2) = (
                triangle[0] as usize,
                triangle[1] as usize,
                triangle[2] as usize,
            );
            if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
                continue;
            }
            let (v0, v1, v2) = (positions[i0], positions[i1], positions[i2]);

            let edge1 = [v1[0] - v0[0], v1[1] - v0[1], v1[2] - v0[2]];
            let edge2 = [v2[0] - v0[0], v2[1] - v0[1], v2[2] - v0[2]];

            // Unnormalized, so larger faces weigh more
            let face_normal = [
                edge1[1] * edge2[2] - edge1[2] * edge2[1],
                edge1[2] * edge2[0] - edge1[0] * edge2[2],
                edge1[0] * edge2[1] - edge1[1] * edge2[0],
            ];

            for vertex_idx in [i0, i1, i2] {
                for axis in 0..3 {
                    normals[vertex_idx][axis] += face_normal[axis];
                }
            }
        }

        for normal in &mut normals {
            let length = (normal[0].powi(2) + normal[1].powi(2) + normal[2].powi(2)).sqrt();
            if length > 0.0 {
                for axis in normal.iter_mut() {
                    *axis /= length;
                }
            }
        }

        normals
    }
}

/// Vertex and index buffers for one uploaded mesh
pub struct MeshBuffers {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

/// A mesh paired with a shared material.
///
/// Models are handed to the scene as `Arc<Model>` so one loaded model can
/// be placed several times. GPU buffers are created on first draw.
pub struct Model {
    pub name: String,
    mesh: Mesh,
    material: Arc<Material>,
    gpu: OnceLock<MeshBuffers>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("vertices", &self.mesh.vertices.len())
            .field("triangles", &self.mesh.triangle_count())
            .field("material", &self.material.name)
            .finish()
    }
}

impl Model {
    pub fn new(name: &str, mesh: Mesh, material: Arc<Material>) -> Self {
        Self {
            name: name.to_string(),
            mesh,
            material,
            gpu: OnceLock::new(),
        }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    pub fn is_uploaded(&self) -> bool {
        self.gpu.get().is_some()
    }

    /// Returns the mesh buffers, creating them on first use.
    pub fn gpu_buffers(&self, device: &wgpu::Device) -> &MeshBuffers {
        self.gpu.get_or_init(|| {
            log::debug!(
                "creating buffers for '{}': {} vertices, {} indices",
                self.name,
                self.mesh.vertices.len(),
                self.mesh.indices.len()
            );

            let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Vertex Buffer", self.name)),
                contents: bytemuck::cast_slice(&self.mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

            let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Index Buffer", self.name)),
                contents: bytemuck::cast_slice(&self.mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

            MeshBuffers {
                vertex_buffer,
                index_buffer,
                index_count: self.mesh.index_count(),
            }
        })
    }
}
