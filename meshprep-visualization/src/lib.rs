//! Visualization for meshprep
//!
//! Meshes are drawn by a small CPU rasterizer. Still captures save its output
//! as PNG; the interactive viewer shows the same frames in a window:
//! - [`Renderer`] trait with still capture and interactive display
//! - [`SoftwareRenderer`], the implementation used by the batch tool
//! - Orbit camera framed on the mesh bounding sphere

pub mod camera;
pub mod interactive_viewer;
pub mod raster;
pub mod renderer;
pub mod shaders;

pub use camera::*;
pub use interactive_viewer::InteractiveViewer;
pub use raster::rasterize;
pub use renderer::*;
