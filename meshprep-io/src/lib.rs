//! Mesh I/O for meshprep
//!
//! This crate loads triangle meshes from OBJ, PLY, STL and GLB files, writes
//! PLY output and produces the batch summary table. Loading goes through
//! [`read_mesh`], which picks a reader from the file extension.

pub mod glb;
pub mod obj;
pub mod ply;
pub mod stl;
pub mod summary;

pub use ply::{PlyFormat, PlyReader, PlyWriteOptions, PlyWriter};
pub use summary::{write_summary_csv, SummaryCsvWriter};

use meshprep_core::{Error, Result, TriangleMesh};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Trait for reading meshes from files
pub trait MeshReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh>;
}

/// Trait for writing meshes to files
pub trait MeshWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()>;
}

/// Mesh file formats recognized by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    Obj,
    Ply,
    Stl,
    Fbx,
    Glb,
}

impl MeshFormat {
    pub const ALL: [MeshFormat; 5] = [
        MeshFormat::Obj,
        MeshFormat::Ply,
        MeshFormat::Stl,
        MeshFormat::Fbx,
        MeshFormat::Glb,
    ];

    /// Match an extension without the leading dot, ignoring case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(ext))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MeshFormat::Obj => "obj",
            MeshFormat::Ply => "ply",
            MeshFormat::Stl => "stl",
            MeshFormat::Fbx => "fbx",
            MeshFormat::Glb => "glb",
        }
    }

    /// FBX files are recognized so they show up as skipped rather than
    /// ignored, but there is no reader for them.
    pub fn is_readable(&self) -> bool {
        !matches!(self, MeshFormat::Fbx)
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Auto-detect format and read a mesh.
///
/// The returned mesh has at least one vertex and every face index is in
/// range; anything else is reported as an error.
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    let format = MeshFormat::from_path(path).ok_or_else(|| {
        Error::UnsupportedFormat(format!("Unsupported mesh format: {:?}", path.extension()))
    })?;

    let mesh = match format {
        MeshFormat::Obj => obj::ObjReader::read_mesh(path)?,
        MeshFormat::Ply => ply::PlyReader::read_mesh(path)?,
        MeshFormat::Stl => stl::StlReader::read_mesh(path)?,
        MeshFormat::Glb => glb::GlbReader::read_mesh(path)?,
        MeshFormat::Fbx => {
            return Err(Error::UnsupportedFormat(format!(
                "no {} reader is available for {}",
                format,
                path.display()
            )))
        }
    };

    if mesh.is_empty() {
        return Err(Error::UnreadableMesh(format!(
            "{} contains no vertices",
            path.display()
        )));
    }
    mesh.validate_faces()?;

    debug!(
        path = %path.display(),
        %format,
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "loaded mesh"
    );
    Ok(mesh)
}

/// Auto-detect format and write a mesh. Only PLY output is supported.
pub fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    match MeshFormat::from_path(path) {
        Some(MeshFormat::Ply) => ply::PlyWriter::write_mesh(mesh, path),
        _ => Err(Error::UnsupportedFormat(format!(
            "Unsupported output format: {:?}",
            path.extension()
        ))),
    }
}

/// Append the polygon as a fan of triangles around its first corner.
/// Polygons with fewer than three corners are dropped.
pub(crate) fn triangulate_fan(indices: &[usize], faces: &mut Vec<[usize; 3]>) {
    if indices.len() < 3 {
        return;
    }
    for i in 1..indices.len() - 1 {
        faces.push([indices[0], indices[i], indices[i + 1]]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path_ignores_case() {
        assert_eq!(MeshFormat::from_path("a/b/Bunny.OBJ"), Some(MeshFormat::Obj));
        assert_eq!(MeshFormat::from_path("scan.Ply"), Some(MeshFormat::Ply));
        assert_eq!(MeshFormat::from_path("part.stl"), Some(MeshFormat::Stl));
        assert_eq!(MeshFormat::from_path("rig.FBX"), Some(MeshFormat::Fbx));
        assert_eq!(MeshFormat::from_path("scene.glb"), Some(MeshFormat::Glb));
        assert_eq!(MeshFormat::from_path("notes.txt"), None);
        assert_eq!(MeshFormat::from_path("no_extension"), None);
        assert_eq!(MeshFormat::from_path("scene.gltf"), None);
    }

    #[test]
    fn test_readable_formats() {
        let readable: Vec<_> = MeshFormat::ALL
            .into_iter()
            .filter(MeshFormat::is_readable)
            .collect();
        assert_eq!(
            readable,
            vec![MeshFormat::Obj, MeshFormat::Ply, MeshFormat::Stl, MeshFormat::Glb]
        );
    }

    #[test]
    fn test_fan_triangulation() {
        let mut faces = Vec::new();
        triangulate_fan(&[4, 5], &mut faces);
        assert!(faces.is_empty());

        triangulate_fan(&[0, 1, 2, 3, 4], &mut faces);
        assert_eq!(faces, vec![[0, 1, 2], [0, 2, 3], [0, 3, 4]]);
    }
}
