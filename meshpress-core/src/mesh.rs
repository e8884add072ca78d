//! Mesh data structures and functionality

use crate::point::*;
use serde::{Deserialize, Serialize};

/// A polygon mesh as read from disk: faces of arbitrary arity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolygonMesh {
    pub vertices: Vec<Point3f>,
    /// Zero-based vertex ids, at least three per face
    pub faces: Vec<Vec<usize>>,
    /// Texture coordinates in source order; not referenced by `faces`
    pub uvs: Vec<Uv>,
}

/// A triangle mesh with vertices and faces
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
}

impl PolygonMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<Vec<usize>>) -> Self {
        Self {
            vertices,
            faces,
            uvs: Vec::new(),
        }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty()
    }

    /// Number of triangles a fan split of every face would produce
    pub fn triangle_count_hint(&self) -> usize {
        self.faces.iter().map(|f| f.len().saturating_sub(2)).sum()
    }

    /// First face index that points past the vertex array, as `(face, index)`
    pub fn find_invalid_index(&self) -> Option<(usize, usize)> {
        let n = self.vertices.len();
        self.faces.iter().enumerate().find_map(|(fi, face)| {
            face.iter().find(|&&v| v >= n).map(|&v| (fi, v))
        })
    }
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Every face index is in range and no face repeats a vertex
    pub fn is_well_formed(&self) -> bool {
        let n = self.vertices.len();
        self.faces.iter().all(|f| {
            f.iter().all(|&v| v < n) && f[0] != f[1] && f[1] != f[2] && f[2] != f[0]
        })
    }

    pub fn bounding_box(&self) -> Option<(Point3f, Point3f)> {
        bounding_box(&self.vertices)
    }
}
