//! Command line arguments

use crate::config::BatchConfig;
use crate::logging::LogLevel;
use clap::{Parser, ValueEnum};
use meshprep_core::{DegeneratePolicy, DEFAULT_BINS};
use std::path::PathBuf;

/// Normalize and quantize every mesh in a directory.
///
/// For each OBJ, PLY, STL or GLB file the tool writes a standardized and a
/// quantized PLY, a screenshot of each, and finally a summary.csv with the
/// raw extents of every processed mesh.
#[derive(Debug, Clone, Parser)]
#[command(name = "meshprep", version)]
pub struct Args {
    /// Directory with the input meshes
    #[arg(long = "input_dir", value_name = "DIR")]
    pub input_dir: PathBuf,

    /// Directory for the results; created if missing
    #[arg(long = "output_dir", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Number of quantization bins
    #[arg(long, default_value_t = DEFAULT_BINS, value_parser = clap::value_parser!(u32).range(1..))]
    pub bins: u32,

    /// Do not open interactive windows (files and screenshots are still written)
    #[arg(long = "no_vis")]
    pub no_vis: bool,

    /// How to treat meshes with zero spread on an axis
    #[arg(long = "on_degenerate", value_enum, default_value_t = OnDegenerate::Collapse)]
    pub on_degenerate: OnDegenerate,

    /// Log verbosity; RUST_LOG takes precedence when set
    #[arg(long = "log_level", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

/// Command line spelling of [`DegeneratePolicy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnDegenerate {
    /// Map flat axes to zero and keep the mesh
    Collapse,
    /// Skip the mesh
    Reject,
}

impl From<OnDegenerate> for DegeneratePolicy {
    fn from(value: OnDegenerate) -> Self {
        match value {
            OnDegenerate::Collapse => DegeneratePolicy::Collapse,
            OnDegenerate::Reject => DegeneratePolicy::Reject,
        }
    }
}

impl From<Args> for BatchConfig {
    fn from(args: Args) -> Self {
        BatchConfig::new(args.input_dir, args.output_dir)
            .with_bins(args.bins)
            .with_visualization(!args.no_vis)
            .with_degenerate_policy(args.on_degenerate.into())
    }
}
