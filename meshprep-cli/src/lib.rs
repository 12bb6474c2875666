//! Batch front end for meshprep
//!
//! Walks an input directory, normalizes and quantizes every mesh it can read,
//! writes the derived meshes and screenshots, and finishes with a summary
//! table. The `meshprep` binary is a thin wrapper around [`process_directory`].

pub mod args;
pub mod batch;
pub mod config;
pub mod logging;

pub use args::{Args, OnDegenerate};
pub use batch::*;
pub use config::BatchConfig;
pub use logging::{init_logging, LogLevel};
