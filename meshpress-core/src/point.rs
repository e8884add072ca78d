//! Point types and related functionality

use nalgebra::Point3;

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A texture coordinate `(u, v)`
pub type Uv = [f32; 2];

/// Axis-aligned bounds of a set of points, `None` when the set is empty
pub fn bounding_box(points: &[Point3f]) -> Option<(Point3f, Point3f)> {
    let first = *points.first()?;
    let mut min = first;
    let mut max = first;

    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        min.z = min.z.min(p.z);

        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
        max.z = max.z.max(p.z);
    }

    Some((min, max))
}
