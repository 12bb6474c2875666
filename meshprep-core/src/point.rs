//! Point types and related functionality

use nalgebra::{Point3, Vector3};

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// Number of coordinate axes of a vertex.
pub const AXES: usize = 3;

/// Widen a single precision point read from a file.
#[inline]
pub fn widen(p: [f32; 3]) -> Point3d {
    Point3d::new(p[0] as f64, p[1] as f64, p[2] as f64)
}

/// Check that every coordinate of the point is finite.
#[inline]
pub fn is_finite_point(p: &Point3d) -> bool {
    p.coords.iter().all(|c| c.is_finite())
}
