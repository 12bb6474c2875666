//! Mesh data structures and functionality

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};

/// A triangle mesh with vertices and faces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3d>,
    pub faces: Vec<[usize; 3]>,
    pub normals: Option<Vec<Vector3d>>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
            normals: None,
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3d>, faces: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
        }
    }

    /// Build a mesh from new vertex positions and an existing triangle set.
    ///
    /// Vertex normals are computed immediately, so the result is ready to be
    /// written or rendered. Faces are copied unchanged.
    pub fn build(vertices: Vec<Point3d>, faces: &[[usize; 3]]) -> Result<Self> {
        let mut mesh = Self::from_vertices_and_faces(vertices, faces.to_vec());
        mesh.validate_faces()?;
        mesh.compute_vertex_normals();
        Ok(mesh)
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh has no geometry.
    ///
    /// A mesh with vertices but no faces is still processed; only the vertex
    /// positions take part in the transform.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3d) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a face to the mesh
    pub fn add_face(&mut self, face: [usize; 3]) {
        self.faces.push(face);
    }

    /// Check that every face references an existing vertex.
    pub fn validate_faces(&self) -> Result<()> {
        let n = self.vertices.len();
        for (i, face) in self.faces.iter().enumerate() {
            if let Some(bad) = face.iter().find(|&&idx| idx >= n) {
                return Err(Error::InvalidData(format!(
                    "face {} references vertex {} but the mesh has {} vertices",
                    i, bad, n
                )));
            }
        }
        Ok(())
    }

    /// Calculate unit face normals.
    ///
    /// Degenerate faces (zero area) get a zero normal.
    pub fn calculate_face_normals(&self) -> Vec<Vector3d> {
        self.faces
            .iter()
            .map(|face| {
                let v0 = self.vertices[face[0]];
                let v1 = self.vertices[face[1]];
                let v2 = self.vertices[face[2]];

                let edge1 = v1 - v0;
                let edge2 = v2 - v0;

                edge1
                    .cross(&edge2)
                    .try_normalize(f64::EPSILON)
                    .unwrap_or_else(Vector3d::zeros)
            })
            .collect()
    }

    /// Compute per-vertex normals from the adjacent face normals.
    ///
    /// Each vertex normal is the renormalized sum of the unit normals of the
    /// faces that use it. Vertices without a usable face get a zero normal.
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vector3d::zeros(); self.vertices.len()];
        for (face, normal) in self.faces.iter().zip(self.calculate_face_normals()) {
            for &idx in face {
                normals[idx] += normal;
            }
        }
        for normal in &mut normals {
            *normal = normal
                .try_normalize(f64::EPSILON)
                .unwrap_or_else(Vector3d::zeros);
        }
        self.normals = Some(normals);
    }

    /// Set vertex normals
    pub fn set_normals(&mut self, normals: Vec<Vector3d>) {
        if normals.len() == self.vertices.len() {
            self.normals = Some(normals);
        }
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3d::new(0.0, 0.0, 0.0),
                Point3d::new(1.0, 0.0, 0.0),
                Point3d::new(1.0, 1.0, 0.0),
                Point3d::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn test_vertex_normals_planar() {
        let mut mesh = unit_square();
        mesh.compute_vertex_normals();

        let normals = mesh.normals.as_ref().unwrap();
        assert_eq!(normals.len(), 4);
        for n in normals {
            assert_relative_eq!(n.z, 1.0, epsilon = 1e-12);
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_degenerate_face_normal_is_zero() {
        let mut mesh = TriangleMesh::from_vertices_and_faces(
            vec![Point3d::origin(), Point3d::origin(), Point3d::origin()],
            vec![[0, 1, 2]],
        );
        mesh.compute_vertex_normals();

        for n in mesh.normals.unwrap() {
            assert_eq!(n, Vector3d::zeros());
        }
    }

    #[test]
    fn test_unreferenced_vertex_gets_zero_normal() {
        let mut mesh = unit_square();
        mesh.add_vertex(Point3d::new(5.0, 5.0, 5.0));
        mesh.compute_vertex_normals();

        assert_eq!(mesh.normals.unwrap()[4], Vector3d::zeros());
    }

    #[test]
    fn test_build_keeps_faces() {
        let source = unit_square();
        let moved: Vec<Point3d> = source.vertices.iter().map(|v| v * 2.0).collect();
        let built = TriangleMesh::build(moved, &source.faces).unwrap();

        assert_eq!(built.faces, source.faces);
        assert!(built.normals.is_some());
    }

    #[test]
    fn test_validate_faces_out_of_range() {
        let mut mesh = unit_square();
        mesh.add_face([0, 1, 9]);

        assert!(matches!(mesh.validate_faces(), Err(Error::InvalidData(_))));
        assert!(TriangleMesh::build(mesh.vertices.clone(), &mesh.faces).is_err());
    }

    #[test]
    fn test_is_empty() {
        assert!(TriangleMesh::new().is_empty());

        let points_only = TriangleMesh::from_vertices_and_faces(vec![Point3d::origin()], vec![]);
        assert!(!points_only.is_empty());
    }
}
