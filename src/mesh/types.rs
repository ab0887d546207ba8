//! Mesh data

use crate::rasterizer::{Vec2, Vec3};

/// A triangle face (indices into the mesh's vertex and UV arrays)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    pub vertices: [usize; 3],
    pub tex_coords: [usize; 3],
}

impl Face {
    pub fn new(vertices: [usize; 3], tex_coords: [usize; 3]) -> Self {
        Self { vertices, tex_coords }
    }
}

/// Indexed triangle mesh.
/// Every face index is in range of `vertices` / `tex_coords`; the
/// rasterizer relies on this without checking.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    vertices: Vec<Vec3>,
    tex_coords: Vec<Vec2>,
    faces: Vec<Face>,
}

impl Mesh {
    /// Build a mesh from raw arrays. Panics if a face points past either array.
    pub fn from_parts(vertices: Vec<Vec3>, tex_coords: Vec<Vec2>, faces: Vec<Face>) -> Self {
        for face in &faces {
            assert!(face.vertices.iter().all(|&i| i < vertices.len()), "face vertex index out of range");
            assert!(face.tex_coords.iter().all(|&i| i < tex_coords.len()), "face texcoord index out of range");
        }
        Self { vertices, tex_coords, faces }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertex(&self, i: usize) -> Vec3 {
        self.vertices[i]
    }

    pub fn tex_coord_count(&self) -> usize {
        self.tex_coords.len()
    }

    pub fn tex_coord(&self, i: usize) -> Vec2 {
        self.tex_coords[i]
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn face_vertex_indices(&self, i: usize) -> [usize; 3] {
        self.faces[i].vertices
    }

    pub fn face_tex_coord_indices(&self, i: usize) -> [usize; 3] {
        self.faces[i].tex_coords
    }

    /// Positions of the three corners of face `i`
    pub fn face_positions(&self, i: usize) -> [Vec3; 3] {
        let [a, b, c] = self.face_vertex_indices(i);
        [self.vertex(a), self.vertex(b), self.vertex(c)]
    }

    /// True when there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty() || self.vertices.is_empty()
    }

    /// Unit cube centred on the origin, scaled to fit [-0.5, 0.5].
    /// Two triangles per side, wound so that normals from
    /// `(v2 - v0) x (v1 - v0)` point outward.
    #[cfg(test)]
    pub fn test_cube() -> Self {
        let h = 0.5;
        let vertices = vec![
            Vec3::new(-h, -h, -h),
            Vec3::new(h, -h, -h),
            Vec3::new(h, h, -h),
            Vec3::new(-h, h, -h),
            Vec3::new(-h, -h, h),
            Vec3::new(h, -h, h),
            Vec3::new(h, h, h),
            Vec3::new(-h, h, h),
        ];
        let tex_coords = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];

        // Corner quads listed clockwise when seen from outside
        let quads = [
            [0, 1, 2, 3], // -Z
            [4, 7, 6, 5], // +Z
            [0, 4, 5, 1], // -Y
            [3, 2, 6, 7], // +Y
            [0, 3, 7, 4], // -X
            [1, 5, 6, 2], // +X
        ];

        let mut faces = Vec::new();
        for q in quads {
            faces.push(Face::new([q[0], q[1], q[2]], [0, 1, 2]));
            faces.push(Face::new([q[0], q[2], q[3]], [0, 2, 3]));
        }

        Self::from_parts(vertices, tex_coords, faces)
    }
}
