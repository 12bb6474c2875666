//! Vertex standardization and bin quantization
//!
//! Every processed mesh goes through the same two steps:
//!
//! 1. **Standardization**: each axis is shifted by its mean and divided by its
//!    population standard deviation, giving zero mean and unit deviation.
//! 2. **Quantization**: the standardized coordinates are mapped onto `bins`
//!    integer levels using ONE range shared by x, y and z. The minimum and
//!    maximum are taken over all three axes of all points together, so the
//!    relative proportions of the mesh survive quantization.
//!
//! Quantized values lie in the closed range `[0, bins - 1]`: the coordinate
//! equal to the global maximum would land on `bins` and is clamped down.
//!
//! Inputs that would divide by zero are handled by a [`DegeneratePolicy`]
//! instead of producing NaN or infinity.

use std::fmt;

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};

/// Default number of quantization bins
pub const DEFAULT_BINS: u32 = 256;

const AXIS_NAMES: [char; AXES] = ['x', 'y', 'z'];

const EXPONENT_MASK: u64 = 0x7ff0_0000_0000_0000;

/// What to do with geometry whose spread is zero on some axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePolicy {
    /// Map every affected coordinate to `0.0` and keep going
    #[default]
    Collapse,
    /// Refuse the mesh with [`Error::DegenerateGeometry`]
    Reject,
}

/// Per-axis mean and population standard deviation of a vertex set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationStats {
    pub mean: Vector3d,
    pub std_dev: Vector3d,
    /// Axes on which every vertex has the same coordinate or the deviation is
    /// zero.
    pub flat_axes: [bool; AXES],
    /// Power of two per axis that brings every coordinate below 2 in
    /// magnitude. Sums run in these units so they cannot overflow.
    pub scale: Vector3d,
}

impl NormalizationStats {
    /// Compute the statistics of a non-empty, finite vertex set
    pub fn compute(vertices: &[Point3d]) -> Result<Self> {
        if vertices.is_empty() {
            return Err(Error::UnreadableMesh("vertex set is empty".to_string()));
        }
        if let Some(i) = vertices.iter().position(|v| !is_finite_point(v)) {
            return Err(Error::InvalidData(format!(
                "vertex {} has a non-finite coordinate: {:?}",
                i, vertices[i]
            )));
        }

        let scale = vertices
            .iter()
            .fold(Vector3d::zeros(), |acc, v| acc.zip_map(&v.coords, |a, c| a.max(c.abs())))
            .map(power_of_two_below);

        let n = vertices.len() as f64;
        let scaled_mean = vertices
            .iter()
            .fold(Vector3d::zeros(), |acc, v| acc + v.coords.component_div(&scale))
            / n;
        let scaled_variance = vertices.iter().fold(Vector3d::zeros(), |acc, v| {
            let d = v.coords.component_div(&scale) - scaled_mean;
            acc + d.component_mul(&d)
        }) / n;
        let mean = scaled_mean.component_mul(&scale);
        let std_dev = scaled_variance.map(f64::sqrt).component_mul(&scale);

        let first = vertices[0];
        let mut flat_axes = [false; AXES];
        for (axis, flat) in flat_axes.iter_mut().enumerate() {
            let sigma = std_dev[axis];
            if !sigma.is_finite() || !mean[axis].is_finite() {
                return Err(Error::InvalidData(
                    "coordinate magnitude overflows statistics".to_string(),
                ));
            }
            // Identical coordinates can still leave a rounding-level deviation
            // behind, so constancy is checked on the data itself.
            let constant = vertices.iter().all(|v| v[axis] == first[axis]);
            *flat = constant || sigma <= 0.0;
        }

        Ok(Self {
            mean,
            std_dev,
            flat_axes,
            scale,
        })
    }

    /// Standardize the vertices: `(v - mean) / std_dev` per axis.
    ///
    /// Flat axes map to exactly `0.0`.
    pub fn standardize(&self, vertices: &[Point3d]) -> Vec<Point3d> {
        // Dividing by a power of two is exact, so working in scaled units
        // gives the same result as the plain formula wherever that one is
        // finite.
        let mean = self.mean.component_div(&self.scale);
        let std_dev = self.std_dev.component_div(&self.scale);
        vertices
            .iter()
            .map(|v| {
                let mut s = Point3d::origin();
                for axis in 0..AXES {
                    if !self.flat_axes[axis] {
                        s[axis] = (v[axis] / self.scale[axis] - mean[axis]) / std_dev[axis];
                    }
                }
                s
            })
            .collect()
    }
}

/// Largest power of two not above `magnitude`, or `1.0` when there is none
/// worth scaling by (zero or subnormal).
fn power_of_two_below(magnitude: f64) -> f64 {
    if magnitude.is_normal() {
        f64::from_bits(magnitude.to_bits() & EXPONENT_MASK)
    } else {
        1.0
    }
}

/// Global scalar range of a standardized vertex set, over all axes combined
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizationRange {
    pub min: f64,
    pub max: f64,
}

impl QuantizationRange {
    /// Take the minimum and maximum over every coordinate of every point
    pub fn compute(standardized: &[Point3d]) -> Self {
        if standardized.is_empty() {
            return Self { min: 0.0, max: 0.0 };
        }

        let (min, max) = standardized
            .iter()
            .flat_map(|p| p.coords.iter().copied())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), c| {
                (lo.min(c), hi.max(c))
            });
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Whether the range is empty, leaving nothing to divide by
    pub fn is_collapsed(&self) -> bool {
        let span = self.span();
        !(span.is_finite() && span > 0.0)
    }

    /// Map one standardized coordinate onto `[0, bins - 1]`
    #[inline]
    pub fn quantize_value(&self, value: f64, bins: u32) -> f64 {
        if self.is_collapsed() {
            return 0.0;
        }
        let top = f64::from(bins.saturating_sub(1));
        ((value - self.min) / self.span() * f64::from(bins))
            .floor()
            .clamp(0.0, top)
    }

    /// Quantize every coordinate of the standardized set
    pub fn quantize(&self, standardized: &[Point3d], bins: u32) -> Vec<Point3d> {
        standardized
            .iter()
            .map(|p| p.map(|c| self.quantize_value(c, bins)))
            .collect()
    }
}

/// Degenerate conditions met while transforming one vertex set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Degeneracy {
    pub flat_axes: [bool; AXES],
    pub collapsed_range: bool,
}

impl Degeneracy {
    pub fn is_degenerate(&self) -> bool {
        self.collapsed_range || self.flat_axes.iter().any(|&f| f)
    }
}

impl fmt::Display for Degeneracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flat: Vec<String> = self
            .flat_axes
            .iter()
            .zip(AXIS_NAMES)
            .filter(|(flat, _)| **flat)
            .map(|(_, name)| name.to_string())
            .collect();

        match (flat.is_empty(), self.collapsed_range) {
            (true, false) => write!(f, "no degeneracy"),
            (false, false) => write!(f, "zero variance on axis {}", flat.join(", ")),
            (true, true) => write!(f, "zero quantization range"),
            (false, true) => write!(
                f,
                "zero variance on axis {} and zero quantization range",
                flat.join(", ")
            ),
        }
    }
}

/// Result of transforming one vertex set
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedVertices {
    /// Zero-mean, unit-deviation coordinates
    pub standardized: Vec<Point3d>,
    /// Integer bin indices stored as `f64`
    pub quantized: Vec<Point3d>,
    pub stats: NormalizationStats,
    pub range: QuantizationRange,
    pub degeneracy: Degeneracy,
}

/// The standardize-then-quantize transform applied to every mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexTransform {
    bins: u32,
    policy: DegeneratePolicy,
}

impl VertexTransform {
    /// Create a transform with the given quantization resolution
    pub fn new(bins: u32) -> Self {
        Self {
            bins,
            policy: DegeneratePolicy::default(),
        }
    }

    /// Choose how degenerate vertex sets are handled
    pub fn with_policy(mut self, policy: DegeneratePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn bins(&self) -> u32 {
        self.bins
    }

    pub fn policy(&self) -> DegeneratePolicy {
        self.policy
    }

    /// Apply the transform to a vertex set.
    ///
    /// The output vectors have the same length and order as `vertices`.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidData`] when `bins` is zero or a coordinate is not finite
    /// * [`Error::UnreadableMesh`] when `vertices` is empty
    /// * [`Error::DegenerateGeometry`] when the policy is [`DegeneratePolicy::Reject`]
    ///   and the set has zero spread somewhere
    pub fn apply(&self, vertices: &[Point3d]) -> Result<TransformedVertices> {
        if self.bins == 0 {
            return Err(Error::InvalidData(
                "number of quantization bins must be at least 1".to_string(),
            ));
        }

        let stats = NormalizationStats::compute(vertices)?;
        let standardized = stats.standardize(vertices);
        let range = QuantizationRange::compute(&standardized);

        let degeneracy = Degeneracy {
            flat_axes: stats.flat_axes,
            collapsed_range: range.is_collapsed(),
        };
        if degeneracy.is_degenerate() && self.policy == DegeneratePolicy::Reject {
            return Err(Error::DegenerateGeometry(degeneracy.to_string()));
        }

        let quantized = range.quantize(&standardized, self.bins);

        Ok(TransformedVertices {
            standardized,
            quantized,
            stats,
            range,
            degeneracy,
        })
    }
}

impl Default for VertexTransform {
    fn default() -> Self {
        Self::new(DEFAULT_BINS)
    }
}

/// Standardize and quantize with the default degenerate policy
pub fn normalize_and_quantize(vertices: &[Point3d], bins: u32) -> Result<TransformedVertices> {
    VertexTransform::new(bins).apply(vertices)
}
