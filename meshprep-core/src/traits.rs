//! Core traits for meshprep

use crate::{mesh::*, point::*};

/// Trait for drawable/renderable objects
pub trait Drawable {
    /// Get the bounding box of the object
    fn bounding_box(&self) -> (Point3d, Point3d);

    /// Get the center point of the object
    fn center(&self) -> Point3d {
        let (min, max) = self.bounding_box();
        nalgebra::center(&min, &max)
    }

    /// Radius of the sphere around `center` that encloses the bounding box
    fn bounding_radius(&self) -> f64 {
        let (min, max) = self.bounding_box();
        (max - min).norm() / 2.0
    }
}

impl Drawable for [Point3d] {
    fn bounding_box(&self) -> (Point3d, Point3d) {
        if self.is_empty() {
            return (Point3d::origin(), Point3d::origin());
        }

        let mut min = self[0];
        let mut max = self[0];

        for vertex in self {
            min.x = min.x.min(vertex.x);
            min.y = min.y.min(vertex.y);
            min.z = min.z.min(vertex.z);

            max.x = max.x.max(vertex.x);
            max.y = max.y.max(vertex.y);
            max.z = max.z.max(vertex.z);
        }

        (min, max)
    }
}

impl Drawable for TriangleMesh {
    fn bounding_box(&self) -> (Point3d, Point3d) {
        self.vertices.as_slice().bounding_box()
    }
}
