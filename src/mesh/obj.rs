//! Wavefront OBJ loading
//!
//! Parsing is delegated to `tobj`; this module flattens its per-object
//! meshes into one `Mesh` with separate position and UV index streams.

use std::path::Path;
use log::{debug, info};
use crate::rasterizer::{Vec2, Vec3};
use super::{Face, Mesh};

/// Error type for mesh loading
#[derive(Debug)]
pub enum MeshError {
    LoadError(tobj::LoadError),
    /// File parsed but holds no triangles
    Empty,
}

impl From<tobj::LoadError> for MeshError {
    fn from(e: tobj::LoadError) -> Self {
        MeshError::LoadError(e)
    }
}

impl std::fmt::Display for MeshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshError::LoadError(e) => write!(f, "OBJ error: {}", e),
            MeshError::Empty => write!(f, "mesh has no faces"),
        }
    }
}

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

/// Load a mesh from an OBJ file
pub fn load_mesh<P: AsRef<Path>>(path: P) -> Result<Mesh, MeshError> {
    let path = path.as_ref();
    // Materials are not used; a missing .mtl is not an error
    let (models, _materials) = tobj::load_obj(path, &load_options())?;
    let mesh = mesh_from_models(&models)?;
    info!(
        "Loaded mesh {}: {} vertices, {} texcoords, {} faces",
        path.display(),
        mesh.vertex_count(),
        mesh.tex_coord_count(),
        mesh.face_count()
    );
    Ok(mesh)
}

/// Load a mesh from OBJ source text
#[cfg(test)]
pub fn load_mesh_from_str(s: &str) -> Result<Mesh, MeshError> {
    let mut reader = s.as_bytes();
    let (models, _materials) = tobj::load_obj_buf(&mut reader, &load_options(), |_| {
        Err(tobj::LoadError::OpenFileFailed)
    })?;
    mesh_from_models(&models)
}

/// Concatenate tobj models, rebasing their indices into shared arrays.
/// Faces without UVs point at an appended (0, 0) texcoord.
fn mesh_from_models(models: &[tobj::Model]) -> Result<Mesh, MeshError> {
    let mut vertices = Vec::new();
    let mut tex_coords = Vec::new();
    let mut faces = Vec::new();

    for model in models {
        let m = &model.mesh;
        let v_base = vertices.len();
        let t_base = tex_coords.len();

        vertices.extend(m.positions.chunks_exact(3).map(|p| Vec3::new(p[0], p[1], p[2])));
        tex_coords.extend(m.texcoords.chunks_exact(2).map(|t| Vec2::new(t[0], t[1])));

        let fallback_uv = if m.texcoord_indices.len() == m.indices.len() {
            None
        } else {
            tex_coords.push(Vec2::default());
            Some(tex_coords.len() - 1)
        };

        for (i, tri) in m.indices.chunks_exact(3).enumerate() {
            let v = [
                v_base + tri[0] as usize,
                v_base + tri[1] as usize,
                v_base + tri[2] as usize,
            ];
            let t = match fallback_uv {
                Some(uv) => [uv; 3],
                None => {
                    let ti = &m.texcoord_indices[i * 3..i * 3 + 3];
                    [
                        t_base + ti[0] as usize,
                        t_base + ti[1] as usize,
                        t_base + ti[2] as usize,
                    ]
                }
            };
            faces.push(Face::new(v, t));
        }

        debug!("object '{}': {} triangles", model.name, m.indices.len() / 3);
    }

    let mesh = Mesh::from_parts(vertices, tex_coords, faces);
    if mesh.is_empty() {
        return Err(MeshError::Empty);
    }
    Ok(mesh)
}
