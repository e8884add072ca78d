//! Mesh simplification and decimation algorithms
//!
//! This crate turns parsed polygon meshes into triangle meshes and reduces
//! their triangle count:
//! - Triangulation of triangle and quad faces
//! - Quadric error metrics
//! - Edge collapse decimation

pub mod triangulate;
pub mod quadric_error;
pub mod edge_collapse;

pub use triangulate::*;
pub use quadric_error::*;
pub use edge_collapse::*;

use meshpress_core::{Error, Result, TriangleMesh};

/// Factor applied when the caller does not choose one
pub const DEFAULT_DECIMATION_FACTOR: f64 = 0.5;

/// Simplify a mesh by reducing the number of faces/vertices
pub trait MeshSimplifier {
    /// Simplify mesh down to `floor(face_count * decimation_factor)` triangles,
    /// with `decimation_factor` in (0.0, 1.0]
    fn simplify(&self, mesh: &TriangleMesh, decimation_factor: f64) -> Result<TriangleMesh>;
}

/// Triangle count a decimation aims for: `floor(triangle_count * factor)`.
///
/// Fails with [`Error::InvalidDecimation`] when the factor is not a finite
/// number in (0, 1] or the target would be zero triangles.
pub fn decimation_target(triangle_count: usize, factor: f64) -> Result<usize> {
    let target = if factor.is_finite() && factor > 0.0 {
        (triangle_count as f64 * factor).floor() as usize
    } else {
        0
    };

    if target < 1 || !factor.is_finite() || factor > 1.0 {
        return Err(Error::InvalidDecimation {
            factor,
            triangle_count,
            target,
        });
    }
    Ok(target)
}

/// Decimate with the default [`EdgeCollapseSimplifier`]
pub fn decimate(mesh: &TriangleMesh, decimation_factor: f64) -> Result<TriangleMesh> {
    EdgeCollapseSimplifier::default().simplify(mesh, decimation_factor)
}
