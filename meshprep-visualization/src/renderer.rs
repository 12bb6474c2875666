//! Rendering front end

use crate::camera::Camera;
use crate::interactive_viewer::InteractiveViewer;
use crate::raster::rasterize;
use image::ImageError;
use meshprep_core::{Error, Result, TriangleMesh};
use std::path::Path;
use tracing::debug;

/// Options for still captures and viewer frames
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    /// Linear RGB, 0..1
    pub background: [f32; 3],
    pub mesh_color: [f32; 3],
    pub show_back_faces: bool,
    pub lighting: bool,
    /// Camera distance relative to a snug fit of the bounding sphere
    pub zoom: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            background: [1.0, 0.9, 0.95],
            mesh_color: [0.62, 0.64, 0.7],
            show_back_faces: true,
            lighting: true,
            zoom: 0.8,
        }
    }
}

impl RenderOptions {
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_background(mut self, background: [f32; 3]) -> Self {
        self.background = background;
        self
    }

    pub fn with_mesh_color(mut self, color: [f32; 3]) -> Self {
        self.mesh_color = color;
        self
    }

    pub fn with_back_faces(mut self, show: bool) -> Self {
        self.show_back_faces = show;
        self
    }

    pub fn with_lighting(mut self, lighting: bool) -> Self {
        self.lighting = lighting;
        self
    }

    pub fn with_zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width.max(1) as f64 / self.height.max(1) as f64
    }
}

/// Something that can show a mesh.
///
/// Both calls block until they are done; for the interactive window that
/// means until the user closes it.
pub trait Renderer {
    /// Render `mesh` off screen and save the picture to `path`.
    fn capture_still(&mut self, mesh: &TriangleMesh, path: &Path, options: &RenderOptions) -> Result<()>;

    /// Open a window titled `title` showing `mesh`.
    fn show_interactive(&mut self, mesh: &TriangleMesh, title: &str) -> Result<()>;
}

/// Renderer that rasterizes on the CPU and presents frames through wgpu
#[derive(Default)]
pub struct SoftwareRenderer {
    viewer: InteractiveViewer,
}

impl SoftwareRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for SoftwareRenderer {
    fn capture_still(&mut self, mesh: &TriangleMesh, path: &Path, options: &RenderOptions) -> Result<()> {
        let camera = Camera::framing(mesh, options.aspect_ratio(), options.zoom);
        let image = rasterize(mesh, &camera, options);

        image.save(path).map_err(|e| match e {
            ImageError::IoError(io) => Error::Io(io),
            other => Error::Visualization(format!(
                "failed to save {}: {}",
                path.display(),
                other
            )),
        })?;

        debug!(
            path = %path.display(),
            width = options.width,
            height = options.height,
            "captured still"
        );
        Ok(())
    }

    fn show_interactive(&mut self, mesh: &TriangleMesh, title: &str) -> Result<()> {
        self.viewer.show(mesh, title, &RenderOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshprep_core::Point3d;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let options = RenderOptions::default();
        assert_eq!((options.width, options.height), (1920, 1080));
        assert_eq!(options.background, [1.0, 0.9, 0.95]);
        assert!(options.show_back_faces);
        assert_eq!(options.zoom, 0.8);
    }

    #[test]
    fn test_capture_still_writes_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tri.png");
        let mesh = TriangleMesh::build(
            vec![
                Point3d::new(0.0, 0.0, 0.0),
                Point3d::new(1.0, 0.0, 0.0),
                Point3d::new(0.0, 1.0, 0.0),
            ],
            &[[0, 1, 2]],
        )
        .unwrap();

        let options = RenderOptions::default()
            .with_size(40, 30)
            .with_background([0.0, 0.0, 0.0])
            .with_zoom(1.0);
        SoftwareRenderer::new()
            .capture_still(&mesh, &path, &options)
            .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (40, 30));
        assert_eq!(*decoded.get_pixel(0, 0), crate::raster::to_rgba(options.background));
        assert!(decoded.pixels().any(|p| *p != crate::raster::to_rgba(options.background)));
    }

    #[test]
    fn test_capture_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("tri.png");
        let mesh = TriangleMesh::from_vertices_and_faces(vec![Point3d::origin()], vec![]);

        let options = RenderOptions::default().with_size(8, 8);
        assert!(SoftwareRenderer::new()
            .capture_still(&mesh, &path, &options)
            .is_err());
    }
}
