//! OBJ format support

use crate::{triangulate_fan, MeshReader};
use meshprep_core::{widen, Error, Result, TriangleMesh};
use obj::Obj;
use std::path::Path;

pub struct ObjReader;

impl MeshReader for ObjReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let path = path.as_ref();
        let obj = Obj::load(path).map_err(|e| {
            Error::InvalidData(format!("failed to parse OBJ {}: {}", path.display(), e))
        })?;

        let vertices = obj.data.position.iter().copied().map(widen).collect();

        // Indices are already resolved to zero-based positions; texture and
        // normal references are ignored.
        let mut faces = Vec::new();
        for object in &obj.data.objects {
            for group in &object.groups {
                for poly in &group.polys {
                    let indices: Vec<usize> = poly.0.iter().map(|tuple| tuple.0).collect();
                    triangulate_fan(&indices, &mut faces);
                }
            }
        }

        Ok(TriangleMesh::from_vertices_and_faces(vertices, faces))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshprep_core::Point3d;
    use tempfile::tempdir;

    #[test]
    fn test_read_triangles_and_quads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mixed.obj");
        std::fs::write(
            &path,
            "# mixed faces\n\
             v 0 0 0\n\
             v 1 0 0\n\
             v 1 1 0\n\
             v 0 1 0\n\
             v 0 0 1\n\
             vn 0 0 1\n\
             f 1//1 2//1 3//1 4//1\n\
             f 1 2 5\n",
        )
        .unwrap();

        let mesh = ObjReader::read_mesh(&path).unwrap();
        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(mesh.vertices[4], Point3d::new(0.0, 0.0, 1.0));
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3], [0, 1, 4]]);
    }

    #[test]
    fn test_negative_indices_are_relative() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("relative.obj");
        std::fs::write(&path, "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n").unwrap();

        let mesh = ObjReader::read_mesh(&path).unwrap();
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_garbage_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.obj");
        std::fs::write(&path, "v 0 0 zero\nf 1 2\n").unwrap();

        assert!(ObjReader::read_mesh(&path).is_err());
    }
}
