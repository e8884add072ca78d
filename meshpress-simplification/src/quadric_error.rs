//! Quadric error metrics
//!
//! Each vertex accumulates the fundamental error quadrics `p pᵀ` of the planes
//! of its incident triangles. The cost of placing a merged vertex at `v` is
//! `vᵀ Q v`, the sum of squared distances to those planes.

use meshpress_core::Point3f;
use nalgebra::{Matrix4, Vector4};

/// Symmetric 4x4 error quadric
pub type Quadric = Matrix4<f64>;

/// Below this `|det(Q3)|` the optimal position is treated as undefined.
/// `Q3` sums outer products of unit normals, so the bound does not depend on
/// model scale.
const SINGULAR_DET: f64 = 1e-9;

/// Plane `(a, b, c, d)` with unit normal through a triangle, `None` if degenerate
pub fn triangle_plane(v0: &Point3f, v1: &Point3f, v2: &Point3f) -> Option<Vector4<f64>> {
    let p0 = v0.coords.cast::<f64>();
    let e1 = v1.coords.cast::<f64>() - p0;
    let e2 = v2.coords.cast::<f64>() - p0;
    let n = e1.cross(&e2);
    let len = n.norm();
    if !len.is_finite() || len <= f64::EPSILON {
        return None;
    }
    let n = n / len;
    Some(Vector4::new(n.x, n.y, n.z, -n.dot(&p0)))
}

pub fn plane_to_quadric(p: &Vector4<f64>) -> Quadric {
    p * p.transpose()
}

/// Quadric of a triangle, zero for degenerate triangles
pub fn triangle_quadric(v0: &Point3f, v1: &Point3f, v2: &Point3f) -> Quadric {
    triangle_plane(v0, v1, v2)
        .map(|p| plane_to_quadric(&p))
        .unwrap_or_else(Quadric::zeros)
}

/// Error of placing a vertex at `p`
pub fn quadric_error(q: &Quadric, p: &Point3f) -> f64 {
    let vh = Vector4::new(p.x as f64, p.y as f64, p.z as f64, 1.0);
    (vh.transpose() * q * vh)[0].max(0.0)
}

/// Position minimizing `q` for the merge of `a` and `b`, with its error.
///
/// Solves `Q3 v = -q` when `Q3` is well conditioned; otherwise the cheapest
/// of the midpoint and the two endpoints is used.
pub fn optimal_placement(q: &Quadric, a: &Point3f, b: &Point3f) -> (Point3f, f64) {
    let q3 = q.fixed_view::<3, 3>(0, 0).into_owned();
    let q1 = q.fixed_view::<3, 1>(0, 3).into_owned();

    if q3.determinant().abs() > SINGULAR_DET {
        if let Some(inv) = q3.try_inverse() {
            let v = -inv * q1;
            if v.iter().all(|x| x.is_finite()) {
                let p = Point3f::new(v.x as f32, v.y as f32, v.z as f32);
                return (p, quadric_error(q, &p));
            }
        }
    }

    let mid = Point3f::from((a.coords + b.coords) * 0.5);
    [mid, *a, *b]
        .into_iter()
        .map(|p| (p, quadric_error(q, &p)))
        .min_by(|x, y| x.1.total_cmp(&y.1))
        .unwrap_or((mid, 0.0))
}
