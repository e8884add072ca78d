//! I/O operations for meshes
//!
//! This crate reads the line-oriented polygon format (`v`, `vt`, `f` records)
//! into a [`PolygonMesh`] and writes triangle meshes back out in the same
//! format.

pub mod obj;

pub use obj::{ObjReader, ObjWriter};

use meshpress_core::{PolygonMesh, Result, TriangleMesh};
use std::path::Path;

/// Trait for reading meshes from files
pub trait MeshReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<PolygonMesh>;
}

/// Trait for writing meshes to files
pub trait MeshWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()>;
}

/// Read a polygon mesh; the file name is not used to pick a format
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<PolygonMesh> {
    ObjReader::read_mesh(path)
}

/// Write a triangle mesh in the polygon text format
pub fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
    ObjWriter::write_mesh(mesh, path)
}
