//! glTF binary (GLB) support
//!
//! Triangle primitives of the default scene are flattened into one mesh with
//! every node transform applied, so the result is in scene space.

use crate::MeshReader;
use meshprep_core::{widen, Error, Result, TriangleMesh};
use nalgebra::Matrix4;
use std::path::Path;
use tracing::warn;

pub struct GlbReader;

impl MeshReader for GlbReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let path = path.as_ref();
        let (document, buffers, _images) = gltf::import(path).map_err(|e| {
            Error::InvalidData(format!("failed to import {}: {}", path.display(), e))
        })?;

        let mut mesh = TriangleMesh::new();
        let identity = Matrix4::<f64>::identity();

        match document.default_scene().or_else(|| document.scenes().next()) {
            Some(scene) => {
                for node in scene.nodes() {
                    append_node(&node, &identity, &buffers, &mut mesh);
                }
            }
            None => {
                for gltf_mesh in document.meshes() {
                    append_mesh(&gltf_mesh, &identity, &buffers, &mut mesh);
                }
            }
        }

        Ok(mesh)
    }
}

fn append_node(
    node: &gltf::Node,
    parent: &Matrix4<f64>,
    buffers: &[gltf::buffer::Data],
    out: &mut TriangleMesh,
) {
    let local = Matrix4::from(node.transform().matrix()).cast::<f64>();
    let world = parent * local;

    if let Some(gltf_mesh) = node.mesh() {
        append_mesh(&gltf_mesh, &world, buffers, out);
    }
    for child in node.children() {
        append_node(&child, &world, buffers, out);
    }
}

fn append_mesh(
    gltf_mesh: &gltf::Mesh,
    world: &Matrix4<f64>,
    buffers: &[gltf::buffer::Data],
    out: &mut TriangleMesh,
) {
    for primitive in gltf_mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            warn!(
                mesh = gltf_mesh.index(),
                mode = ?primitive.mode(),
                "skipping non-triangle primitive"
            );
            continue;
        }

        let reader =
            primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
        let Some(positions) = reader.read_positions() else {
            continue;
        };

        let base = out.vertex_count();
        for p in positions {
            out.add_vertex(world.transform_point(&widen(p)));
        }
        let count = out.vertex_count() - base;

        match reader.read_indices() {
            Some(indices) => {
                let indices: Vec<u32> = indices.into_u32().collect();
                for tri in indices.chunks_exact(3) {
                    out.add_face([
                        base + tri[0] as usize,
                        base + tri[1] as usize,
                        base + tri[2] as usize,
                    ]);
                }
            }
            None => {
                for i in 0..count / 3 {
                    out.add_face([base + 3 * i, base + 3 * i + 1, base + 3 * i + 2]);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshprep_core::Point3d;
    use tempfile::tempdir;

    /// Minimal GLB: one triangle, one node translated by (10, 0, 0).
    fn translated_triangle_glb() -> Vec<u8> {
        let mut bin = Vec::new();
        for v in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in v {
                bin.extend_from_slice(&c.to_le_bytes());
            }
        }
        for i in [0u16, 1, 2] {
            bin.extend_from_slice(&i.to_le_bytes());
        }
        while bin.len() % 4 != 0 {
            bin.push(0);
        }

        let mut json = format!(
            r#"{{"asset":{{"version":"2.0"}},"scene":0,"scenes":[{{"nodes":[0]}}],
"nodes":[{{"mesh":0,"translation":[10.0,0.0,0.0]}}],
"meshes":[{{"primitives":[{{"attributes":{{"POSITION":0}},"indices":1}}]}}],
"buffers":[{{"byteLength":{len}}}],
"bufferViews":[{{"buffer":0,"byteOffset":0,"byteLength":36}},{{"buffer":0,"byteOffset":36,"byteLength":6}}],
"accessors":[{{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","min":[0.0,0.0,0.0],"max":[1.0,1.0,0.0]}},
{{"bufferView":1,"componentType":5123,"count":3,"type":"SCALAR"}}]}}"#,
            len = bin.len()
        );
        while json.len() % 4 != 0 {
            json.push(' ');
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut glb = Vec::with_capacity(total);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(json.as_bytes());
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"BIN\0");
        glb.extend_from_slice(&bin);
        glb
    }

    #[test]
    fn test_node_transform_applied() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("triangle.glb");
        std::fs::write(&path, translated_triangle_glb()).unwrap();

        let mesh = GlbReader::read_mesh(&path).unwrap();
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
        assert_eq!(
            mesh.vertices,
            vec![
                Point3d::new(10.0, 0.0, 0.0),
                Point3d::new(11.0, 0.0, 0.0),
                Point3d::new(10.0, 1.0, 0.0),
            ]
        );
    }

    #[test]
    fn test_not_a_glb() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fake.glb");
        std::fs::write(&path, b"definitely not binary gltf").unwrap();

        assert!(matches!(
            GlbReader::read_mesh(&path),
            Err(Error::InvalidData(_))
        ));
    }
}
