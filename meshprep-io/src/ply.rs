//! PLY format support

use crate::{triangulate_fan, MeshReader, MeshWriter};
use meshprep_core::{is_finite_point, Error, Point3d, Result, TriangleMesh, Vector3d};
use ply_rs::{
    parser::Parser,
    ply::{
        Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
        ScalarType,
    },
    writer::Writer,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

pub struct PlyReader;
pub struct PlyWriter;

/// Encoding of the PLY body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlyFormat {
    Ascii,
    #[default]
    BinaryLittleEndian,
    BinaryBigEndian,
}

impl From<PlyFormat> for Encoding {
    fn from(format: PlyFormat) -> Self {
        match format {
            PlyFormat::Ascii => Encoding::Ascii,
            PlyFormat::BinaryLittleEndian => Encoding::BinaryLittleEndian,
            PlyFormat::BinaryBigEndian => Encoding::BinaryBigEndian,
        }
    }
}

/// Options for [`PlyWriter::write_mesh_with_options`].
///
/// The default writes binary little endian with vertex normals, which is
/// what the batch pipeline emits.
#[derive(Debug, Clone, PartialEq)]
pub struct PlyWriteOptions {
    pub format: PlyFormat,
    pub include_normals: bool,
    pub comments: Vec<String>,
}

impl Default for PlyWriteOptions {
    fn default() -> Self {
        Self {
            format: PlyFormat::default(),
            include_normals: true,
            comments: Vec::new(),
        }
    }
}

impl PlyWriteOptions {
    pub fn ascii() -> Self {
        Self {
            format: PlyFormat::Ascii,
            ..Self::default()
        }
    }

    pub fn binary_little_endian() -> Self {
        Self::default()
    }

    pub fn binary_big_endian() -> Self {
        Self {
            format: PlyFormat::BinaryBigEndian,
            ..Self::default()
        }
    }

    pub fn with_normals(mut self, include: bool) -> Self {
        self.include_normals = include;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comments.push(comment.into());
        self
    }
}

impl MeshReader for PlyReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let parser = Parser::<DefaultElement>::new();
        let ply = parser.read_ply(&mut reader)?;

        let mut vertices = Vec::new();
        if let Some(vertex_element) = ply.payload.get("vertex") {
            for vertex in vertex_element {
                let x = extract_property_value(vertex, "x")?;
                let y = extract_property_value(vertex, "y")?;
                let z = extract_property_value(vertex, "z")?;

                vertices.push(Point3d::new(x, y, z));
            }
        }

        // Polygons are split into triangle fans
        let mut faces = Vec::new();
        if let Some(face_element) = ply.payload.get("face") {
            for face in face_element {
                let indices = extract_face_indices(face)?;
                triangulate_fan(&indices, &mut faces);
            }
        }

        let normals = ply.payload.get("vertex").and_then(|vertex_element| {
            vertex_element
                .iter()
                .map(|vertex| {
                    Some(Vector3d::new(
                        extract_property_value(vertex, "nx").ok()?,
                        extract_property_value(vertex, "ny").ok()?,
                        extract_property_value(vertex, "nz").ok()?,
                    ))
                })
                .collect::<Option<Vec<_>>>()
                .filter(|normals| !normals.is_empty())
        });

        let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        if let Some(normals) = normals {
            mesh.set_normals(normals);
        }

        Ok(mesh)
    }
}

impl MeshWriter for PlyWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
        Self::write_mesh_with_options(mesh, path, &PlyWriteOptions::default())
    }
}

impl PlyWriter {
    /// Write a triangle mesh with explicit encoding options.
    ///
    /// Coordinates and normals are written as `double`. Meshes with
    /// non-finite coordinates are refused so that no NaN ever reaches disk.
    pub fn write_mesh_with_options<P: AsRef<Path>>(
        mesh: &TriangleMesh,
        path: P,
        options: &PlyWriteOptions,
    ) -> Result<()> {
        if let Some(i) = mesh.vertices.iter().position(|v| !is_finite_point(v)) {
            return Err(Error::InvalidData(format!(
                "vertex {} has a non-finite coordinate",
                i
            )));
        }
        mesh.validate_faces()?;

        let normals = mesh
            .normals
            .as_ref()
            .filter(|normals| options.include_normals && normals.len() == mesh.vertices.len());

        let mut ply = Ply::<DefaultElement>::new();
        ply.header.encoding = options.format.into();
        ply.header.comments.extend(options.comments.iter().cloned());

        let mut vertex_element = ElementDef::new("vertex".to_string());
        vertex_element.count = mesh.vertices.len();
        let mut property_names = vec!["x", "y", "z"];
        if normals.is_some() {
            property_names.extend(["nx", "ny", "nz"]);
        }
        for name in property_names {
            vertex_element.properties.add(PropertyDef::new(
                name.to_string(),
                PropertyType::Scalar(ScalarType::Double),
            ));
        }
        ply.header.elements.add(vertex_element);

        let mut face_element = ElementDef::new("face".to_string());
        face_element.count = mesh.faces.len();
        face_element.properties.add(PropertyDef::new(
            "vertex_indices".to_string(),
            PropertyType::List(ScalarType::UChar, ScalarType::Int),
        ));
        ply.header.elements.add(face_element);

        let mut vertices = Vec::with_capacity(mesh.vertices.len());
        for (i, vertex) in mesh.vertices.iter().enumerate() {
            let mut element = DefaultElement::new();
            element.insert("x".to_string(), Property::Double(vertex.x));
            element.insert("y".to_string(), Property::Double(vertex.y));
            element.insert("z".to_string(), Property::Double(vertex.z));

            if let Some(normals) = normals {
                let n = sanitize_normal(&normals[i]);
                element.insert("nx".to_string(), Property::Double(n.x));
                element.insert("ny".to_string(), Property::Double(n.y));
                element.insert("nz".to_string(), Property::Double(n.z));
            }

            vertices.push(element);
        }
        ply.payload.insert("vertex".to_string(), vertices);

        let mut faces = Vec::with_capacity(mesh.faces.len());
        for face in &mesh.faces {
            let indices = face
                .iter()
                .map(|&idx| {
                    i32::try_from(idx).map_err(|_| {
                        Error::InvalidData(format!("vertex index {} does not fit a PLY int", idx))
                    })
                })
                .collect::<Result<Vec<i32>>>()?;

            let mut element = DefaultElement::new();
            element.insert("vertex_indices".to_string(), Property::ListInt(indices));
            faces.push(element);
        }
        ply.payload.insert("face".to_string(), faces);

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let writer_instance = Writer::new();
        writer_instance.write_ply(&mut writer, &mut ply)?;
        writer.flush()?;

        Ok(())
    }
}

fn sanitize_normal(normal: &Vector3d) -> Vector3d {
    if normal.iter().all(|c| c.is_finite()) {
        *normal
    } else {
        Vector3d::zeros()
    }
}

/// Extract a scalar property as f64 from a PLY element
fn extract_property_value(element: &DefaultElement, name: &str) -> Result<f64> {
    match element.get(name) {
        Some(Property::Float(val)) => Ok(*val as f64),
        Some(Property::Double(val)) => Ok(*val),
        Some(Property::Char(val)) => Ok(*val as f64),
        Some(Property::UChar(val)) => Ok(*val as f64),
        Some(Property::Short(val)) => Ok(*val as f64),
        Some(Property::UShort(val)) => Ok(*val as f64),
        Some(Property::Int(val)) => Ok(*val as f64),
        Some(Property::UInt(val)) => Ok(*val as f64),
        _ => Err(Error::InvalidData(format!(
            "Property '{}' not found or invalid type",
            name
        ))),
    }
}

/// Extract face indices from a PLY face element
fn extract_face_indices(element: &DefaultElement) -> Result<Vec<usize>> {
    fn signed<T: Copy + Into<i64>>(indices: &[T]) -> Result<Vec<usize>> {
        indices
            .iter()
            .map(|&idx| {
                let idx: i64 = idx.into();
                usize::try_from(idx)
                    .map_err(|_| Error::InvalidData(format!("negative face index {}", idx)))
            })
            .collect()
    }

    match element
        .get("vertex_indices")
        .or_else(|| element.get("vertex_index"))
    {
        Some(Property::ListInt(indices)) => signed(indices),
        Some(Property::ListShort(indices)) => signed(indices),
        Some(Property::ListChar(indices)) => signed(indices),
        Some(Property::ListUInt(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        Some(Property::ListUShort(indices)) => {
            Ok(indices.iter().map(|&idx| idx as usize).collect())
        }
        Some(Property::ListUChar(indices)) => {
            Ok(indices.iter().map(|&idx| idx as usize).collect())
        }
        _ => Err(Error::InvalidData("Face indices not found".to_string())),
    }
}
