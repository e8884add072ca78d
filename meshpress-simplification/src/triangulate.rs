//! Fan triangulation of parsed faces

use meshpress_core::{Error, PolygonMesh, Result, TriangleMesh};

/// Split each face into triangles.
///
/// Triangles pass through unchanged; a quad `[a, b, c, d]` becomes
/// `[a, b, c]` and `[a, c, d]`. Any other arity fails with
/// [`Error::UnsupportedTopology`].
pub fn triangulate_faces(faces: &[Vec<usize>]) -> Result<Vec<[usize; 3]>> {
    let mut triangles = Vec::with_capacity(faces.len() * 2);

    for (fi, face) in faces.iter().enumerate() {
        match face.as_slice() {
            &[a, b, c] => triangles.push([a, b, c]),
            &[a, b, c, d] => {
                triangles.push([a, b, c]);
                triangles.push([a, c, d]);
            }
            other => {
                return Err(Error::UnsupportedTopology {
                    face: fi,
                    arity: other.len(),
                })
            }
        }
    }

    Ok(triangles)
}

/// Triangulate a polygon mesh; vertices are carried over, UVs are dropped
pub fn triangulate(mesh: &PolygonMesh) -> Result<TriangleMesh> {
    let faces = triangulate_faces(&mesh.faces)?;
    Ok(TriangleMesh::from_vertices_and_faces(
        mesh.vertices.clone(),
        faces,
    ))
}
