//! STL format support
//!
//! Both binary and ASCII files are accepted. Every facet contributes its own
//! three vertices, so shared corners appear once per facet, matching how the
//! file stores them.

use crate::{triangulate_fan, MeshReader};
use byteorder::{LittleEndian, ReadBytesExt};
use meshprep_core::{Error, Point3d, Result, TriangleMesh};
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

pub struct StlReader;

const HEADER_SIZE: usize = 80;
const TRIANGLE_SIZE: usize = 50;

impl MeshReader for StlReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let data = std::fs::read(path)?;
        parse_stl(&data)
    }
}

/// Parse an in-memory STL file, detecting the encoding.
pub fn parse_stl(data: &[u8]) -> Result<TriangleMesh> {
    if is_ascii(data) {
        read_ascii(data)
    } else {
        read_binary(&mut Cursor::new(data), data.len())
    }
}

/// Binary files may also start with "solid" in their free-form header, so the
/// declared triangle count is checked against the size first.
fn is_ascii(data: &[u8]) -> bool {
    if data.len() >= HEADER_SIZE + 4 {
        let mut count = [0u8; 4];
        count.copy_from_slice(&data[HEADER_SIZE..HEADER_SIZE + 4]);
        let n = u32::from_le_bytes(count) as usize;
        if n.checked_mul(TRIANGLE_SIZE)
            .and_then(|body| body.checked_add(HEADER_SIZE + 4))
            == Some(data.len())
        {
            return false;
        }
    }

    let head = &data[..data.len().min(512)];
    let text = String::from_utf8_lossy(head);
    text.trim_start().starts_with("solid")
}

fn read_binary<T: Read + Seek>(f: &mut T, len: usize) -> Result<TriangleMesh> {
    if len < HEADER_SIZE + 4 {
        return Err(Error::InvalidData(format!(
            "binary STL needs at least {} bytes, got {}",
            HEADER_SIZE + 4,
            len
        )));
    }

    // The header has no defined structure
    f.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
    let n_triangles = f.read_u32::<LittleEndian>()? as usize;

    let available = (len - HEADER_SIZE - 4) / TRIANGLE_SIZE;
    if n_triangles > available {
        return Err(Error::InvalidData(format!(
            "binary STL declares {} triangles but holds {}",
            n_triangles, available
        )));
    }

    let mut mesh = TriangleMesh::new();
    mesh.vertices.reserve(n_triangles * 3);
    mesh.faces.reserve(n_triangles);

    for _ in 0..n_triangles {
        // Stored normals are often zero; they are recomputed downstream.
        for _ in 0..3 {
            f.read_f32::<LittleEndian>()?;
        }

        let mut corners = [0usize; 3];
        for corner in &mut corners {
            let x = f.read_f32::<LittleEndian>()? as f64;
            let y = f.read_f32::<LittleEndian>()? as f64;
            let z = f.read_f32::<LittleEndian>()? as f64;
            *corner = mesh.add_vertex(Point3d::new(x, y, z));
        }
        mesh.add_face(corners);

        let _attribute_byte_count = f.read_u16::<LittleEndian>()?;
    }

    Ok(mesh)
}

fn read_ascii(data: &[u8]) -> Result<TriangleMesh> {
    let text = std::str::from_utf8(data)
        .map_err(|e| Error::InvalidData(format!("ASCII STL is not valid UTF-8: {}", e)))?;

    let mut mesh = TriangleMesh::new();
    let mut facet: Vec<usize> = Vec::with_capacity(3);

    for (line_no, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("vertex") => {
                let mut coords = [0.0f64; 3];
                for coord in &mut coords {
                    *coord = tokens
                        .next()
                        .and_then(|t| t.parse::<f64>().ok())
                        .ok_or_else(|| {
                            Error::InvalidData(format!(
                                "malformed vertex on line {}",
                                line_no + 1
                            ))
                        })?;
                }
                facet.push(mesh.add_vertex(Point3d::new(coords[0], coords[1], coords[2])));
            }
            Some("endloop") => {
                triangulate_fan(&facet, &mut mesh.faces);
                facet.clear();
            }
            _ => {}
        }
    }

    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    fn binary_stl(triangles: &[[[f32; 3]; 3]], header: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data[..header.len()].copy_from_slice(header);
        data.write_u32::<LittleEndian>(triangles.len() as u32).unwrap();
        for tri in triangles {
            for _ in 0..3 {
                data.write_f32::<LittleEndian>(0.0).unwrap();
            }
            for v in tri {
                for &c in v {
                    data.write_f32::<LittleEndian>(c).unwrap();
                }
            }
            data.write_u16::<LittleEndian>(0).unwrap();
        }
        data
    }

    #[test]
    fn test_binary_facets_are_not_welded() {
        let data = binary_stl(
            &[
                [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            ],
            b"binary",
        );

        let mesh = parse_stl(&data).unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [3, 4, 5]]);
        assert_eq!(mesh.vertices[4], Point3d::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_binary_with_solid_header() {
        let data = binary_stl(
            &[[[0.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 2.0, 0.0]]],
            b"solid exported by a tool that ignores the rules",
        );

        let mesh = parse_stl(&data).unwrap();
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.vertices[1], Point3d::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_truncated_binary() {
        let mut data = binary_stl(&[[[0.0; 3]; 3]], b"");
        data[HEADER_SIZE] = 7;
        assert!(matches!(parse_stl(&data), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_ascii() {
        let text = "solid cube_corner
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0.5
    endloop
  endfacet
  facet normal 0 0 1
    outer loop
      vertex 1e0 0 0
      vertex 1 1 0
      vertex 0 1 -2.5
    endloop
  endfacet
endsolid cube_corner
";
        let mesh = parse_stl(text.as_bytes()).unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [3, 4, 5]]);
        assert_eq!(mesh.vertices[2], Point3d::new(0.0, 1.0, 0.5));
        assert_eq!(mesh.vertices[5], Point3d::new(0.0, 1.0, -2.5));
    }

    #[test]
    fn test_ascii_malformed_vertex() {
        let text = "solid bad\nfacet normal 0 0 1\nouter loop\nvertex 0 zero 0\nendloop\nendfacet\nendsolid bad\n";
        assert!(matches!(
            parse_stl(text.as_bytes()),
            Err(Error::InvalidData(_))
        ));
    }
}
