//! Core data structures and the vertex transform for meshprep
//!
//! This crate provides the fundamental mesh types, the error type shared by the
//! whole workspace, and the per-vertex standardization and bin-quantization
//! transform that every processed mesh goes through.

pub mod point;
pub mod mesh;
pub mod traits;
pub mod transform;
pub mod summary;
pub mod error;

pub use point::*;
pub use mesh::*;
pub use traits::*;
pub use transform::*;
pub use summary::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix4};
