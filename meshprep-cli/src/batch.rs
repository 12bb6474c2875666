//! Batch processing of a mesh directory

use crate::config::BatchConfig;
use meshprep_core::{Error, Result, SummaryRecord, TriangleMesh};
use meshprep_io::{read_mesh, write_mesh, write_summary_csv, MeshFormat};
use meshprep_visualization::Renderer;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, info_span, warn};

/// How a batch run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// At least one mesh was processed and the summary was written
    Completed { summary_path: PathBuf },
    /// Nothing could be processed; no summary file exists
    NoValidMeshes,
    /// Meshes were processed but the summary could not be written
    SummaryFailed { summary_path: PathBuf, reason: String },
}

/// A mesh that was recognized and read but could not be finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Everything a batch run did, in processing order
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub records: Vec<SummaryRecord>,
    /// Files without a recognized mesh extension
    pub skipped: Vec<PathBuf>,
    /// Mesh files that were empty or could not be loaded
    pub unreadable: Vec<PathBuf>,
    pub failed: Vec<MeshFailure>,
    pub outcome: BatchOutcome,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.records.len()
    }

    /// Log the aggregate result of the run
    pub fn log_summary(&self) {
        info!(
            processed = self.records.len(),
            skipped = self.skipped.len(),
            unreadable = self.unreadable.len(),
            failed = self.failed.len(),
            "batch finished"
        );
        for failure in &self.failed {
            error!(path = %failure.path.display(), reason = %failure.reason, "mesh failed");
        }
        match &self.outcome {
            BatchOutcome::Completed { summary_path } => {
                info!(path = %summary_path.display(), "summary written");
            }
            BatchOutcome::NoValidMeshes => warn!("no valid meshes found"),
            BatchOutcome::SummaryFailed {
                summary_path,
                reason,
            } => error!(path = %summary_path.display(), reason = %reason, "summary not written"),
        }
    }
}

/// The four files written for each processed mesh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshOutputs {
    pub normalized_ply: PathBuf,
    pub quantized_ply: PathBuf,
    pub normalized_png: PathBuf,
    pub quantized_png: PathBuf,
}

impl MeshOutputs {
    pub fn new(config: &BatchConfig, name: &str) -> Self {
        Self {
            normalized_ply: config.output_path(name, "normalized", "ply"),
            quantized_ply: config.output_path(name, "quantized", "ply"),
            normalized_png: config.output_path(name, "normalized", "png"),
            quantized_png: config.output_path(name, "quantized", "png"),
        }
    }
}

/// Regular files directly inside `dir`, sorted by name
pub fn collect_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Name used for the outputs of the mesh at `path`: its file stem
pub fn mesh_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Process every file in the input directory.
///
/// Per-mesh problems are recorded in the report and never stop the run, and
/// neither does a failed summary write, which shows up as
/// [`BatchOutcome::SummaryFailed`]. Only an unreadable input directory or an
/// uncreatable output directory is returned as an error.
pub fn process_directory(config: &BatchConfig, renderer: &mut dyn Renderer) -> Result<BatchReport> {
    let inputs = collect_inputs(&config.input_dir)?;
    fs::create_dir_all(&config.output_dir)?;
    info!(
        input = %config.input_dir.display(),
        output = %config.output_dir.display(),
        files = inputs.len(),
        bins = config.bins,
        "starting batch"
    );

    let mut records = Vec::new();
    let mut skipped = Vec::new();
    let mut unreadable = Vec::new();
    let mut failed = Vec::new();

    for path in inputs {
        match MeshFormat::from_path(&path) {
            None => {
                info!(path = %path.display(), "skipping unsupported file");
                skipped.push(path);
                continue;
            }
            Some(format) if !format.is_readable() => {
                warn!(path = %path.display(), %format, "skipping: no reader for this format");
                unreadable.push(path);
                continue;
            }
            Some(_) => {}
        }

        match process_mesh(&path, config, renderer) {
            Ok(record) => records.push(record),
            Err(e) if e.is_unreadable() => {
                warn!(path = %path.display(), "skipping: {}", e);
                unreadable.push(path);
            }
            Err(e) => {
                error!(path = %path.display(), "processing failed: {}", e);
                failed.push(MeshFailure {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    let outcome = if records.is_empty() {
        BatchOutcome::NoValidMeshes
    } else {
        let summary_path = config.summary_path();
        match write_summary_csv(&records, &summary_path) {
            Ok(()) => BatchOutcome::Completed { summary_path },
            Err(e) => BatchOutcome::SummaryFailed {
                summary_path,
                reason: e.to_string(),
            },
        }
    };

    Ok(BatchReport {
        records,
        skipped,
        unreadable,
        failed,
        outcome,
    })
}

/// Load, transform, write and render one mesh.
///
/// Any load failure comes back as [`Error::UnreadableMesh`]. Errors from the
/// interactive window are logged and do not fail the mesh.
pub fn process_mesh(path: &Path, config: &BatchConfig, renderer: &mut dyn Renderer) -> Result<SummaryRecord> {
    let name = mesh_name(path);
    let _span = info_span!("mesh", name = %name).entered();

    let mesh = read_mesh(path).map_err(|e| match e {
        Error::UnreadableMesh(_) | Error::UnsupportedFormat(_) => e,
        other => Error::UnreadableMesh(format!("{}: {}", path.display(), other)),
    })?;
    info!(
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        "loaded"
    );

    let transformed = config.transform().apply(&mesh.vertices)?;
    if transformed.degeneracy.is_degenerate() {
        warn!("degenerate geometry collapsed to zero: {}", transformed.degeneracy);
    }

    let normalized = TriangleMesh::build(transformed.standardized, &mesh.faces)?;
    let quantized = TriangleMesh::build(transformed.quantized, &mesh.faces)?;

    let outputs = MeshOutputs::new(config, &name);
    write_mesh(&normalized, &outputs.normalized_ply)?;
    write_mesh(&quantized, &outputs.quantized_ply)?;
    debug!(
        normalized = %outputs.normalized_ply.display(),
        quantized = %outputs.quantized_ply.display(),
        "meshes written"
    );

    renderer.capture_still(&normalized, &outputs.normalized_png, &config.render)?;
    renderer.capture_still(&quantized, &outputs.quantized_png, &config.render)?;

    if config.visualize {
        let views = [
            (&normalized, format!("{} - Normalized Mesh", name)),
            (&quantized, format!("{} - Quantized Mesh", name)),
        ];
        for (view, title) in views {
            if let Err(e) = renderer.show_interactive(view, &title) {
                warn!(title = %title, "interactive view failed: {}", e);
            }
        }
    }

    Ok(SummaryRecord::from_vertices(name, &mesh.vertices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_mesh_name_is_stem() {
        assert_eq!(mesh_name(Path::new("dir/bunny.obj")), "bunny");
        assert_eq!(mesh_name(Path::new("dir/scan.v2.PLY")), "scan.v2");
    }

    #[test]
    fn test_collect_inputs_sorted_files_only() {
        let dir = tempdir().unwrap();
        for name in ["b.ply", "a.obj", "c.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("nested.obj")).unwrap();

        let names: Vec<String> = collect_inputs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.obj", "b.ply", "c.txt"]);
    }

    #[test]
    fn test_output_layout() {
        let config = BatchConfig::new("in", "out");
        let outputs = MeshOutputs::new(&config, "cube");
        assert_eq!(outputs.normalized_ply, Path::new("out/cube_normalized.ply"));
        assert_eq!(outputs.quantized_ply, Path::new("out/cube_quantized.ply"));
        assert_eq!(outputs.normalized_png, Path::new("out/cube_normalized.png"));
        assert_eq!(outputs.quantized_png, Path::new("out/cube_quantized.png"));
    }
}
