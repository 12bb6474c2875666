//! Batch run configuration

use meshprep_core::{DegeneratePolicy, VertexTransform, DEFAULT_BINS};
use meshprep_visualization::RenderOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the summary table written into the output directory
pub const SUMMARY_FILE_NAME: &str = "summary.csv";

/// Everything a batch run needs to know
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub bins: u32,
    /// Open an interactive window for each derived mesh
    pub visualize: bool,
    pub on_degenerate: DegeneratePolicy,
    /// Still capture settings
    #[serde(skip)]
    pub render: RenderOptions,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("output"),
            bins: DEFAULT_BINS,
            visualize: true,
            on_degenerate: DegeneratePolicy::default(),
            render: RenderOptions::default(),
        }
    }
}

impl BatchConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_bins(mut self, bins: u32) -> Self {
        self.bins = bins;
        self
    }

    pub fn with_visualization(mut self, visualize: bool) -> Self {
        self.visualize = visualize;
        self
    }

    pub fn with_degenerate_policy(mut self, policy: DegeneratePolicy) -> Self {
        self.on_degenerate = policy;
        self
    }

    pub fn with_render_options(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }

    /// The vertex transform configured by this run
    pub fn transform(&self) -> VertexTransform {
        VertexTransform::new(self.bins).with_policy(self.on_degenerate)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join(SUMMARY_FILE_NAME)
    }

    /// Path of an output file for mesh `name`, e.g. `bunny_quantized.ply`
    pub fn output_path(&self, name: &str, suffix: &str, extension: &str) -> PathBuf {
        output_path(&self.output_dir, name, suffix, extension)
    }
}

fn output_path(dir: &Path, name: &str, suffix: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}_{}.{}", name, suffix, extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_builders() {
        let config = BatchConfig::new("in", "out");
        assert_eq!(config.bins, 256);
        assert!(config.visualize);
        assert_eq!(config.on_degenerate, DegeneratePolicy::Collapse);

        let config = config
            .with_bins(16)
            .with_visualization(false)
            .with_degenerate_policy(DegeneratePolicy::Reject);
        assert_eq!(config.transform().bins(), 16);
        assert_eq!(config.transform().policy(), DegeneratePolicy::Reject);
        assert!(!config.visualize);

        let config = config.with_render_options(RenderOptions::default().with_size(64, 48));
        assert_eq!((config.render.width, config.render.height), (64, 48));
    }

    #[test]
    fn test_output_paths() {
        let config = BatchConfig::new("in", "out");
        assert_eq!(config.summary_path(), Path::new("out").join("summary.csv"));
        assert_eq!(
            config.output_path("bunny", "normalized", "ply"),
            Path::new("out").join("bunny_normalized.ply")
        );
    }
}
