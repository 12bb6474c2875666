//! Per-mesh summary rows

use crate::point::Point3d;
use crate::traits::Drawable;
use serde::{Deserialize, Serialize};

/// One row of the batch summary table.
///
/// Extents are taken from the raw vertices, before any transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub name: String,
    pub num_vertices: usize,
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl SummaryRecord {
    /// Column names, in output order
    pub const COLUMNS: [&'static str; 8] = [
        "name",
        "num_vertices",
        "min_x",
        "max_x",
        "min_y",
        "max_y",
        "min_z",
        "max_z",
    ];

    /// Build the record for a mesh from its raw vertex positions
    pub fn from_vertices(name: impl Into<String>, vertices: &[Point3d]) -> Self {
        let (min, max) = vertices.bounding_box();
        Self {
            name: name.into(),
            num_vertices: vertices.len(),
            min_x: min.x,
            max_x: max.x,
            min_y: min.y,
            max_y: max.y,
            min_z: min.z,
            max_z: max.z,
        }
    }

    /// Field values as strings, in [`Self::COLUMNS`] order.
    ///
    /// Extents always carry a decimal point or an exponent (`2.0`, `1e-7`) so
    /// readers type the columns as floats.
    pub fn values(&self) -> [String; 8] {
        [
            self.name.clone(),
            self.num_vertices.to_string(),
            float_field(self.min_x),
            float_field(self.max_x),
            float_field(self.min_y),
            float_field(self.max_y),
            float_field(self.min_z),
            float_field(self.max_z),
        ]
    }
}

/// Shortest round-trip text of `value`, never written as a bare integer
fn float_field(value: f64) -> String {
    format!("{:?}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_raw_vertices() {
        let vertices = vec![
            Point3d::new(0.0, -1.5, 2.0),
            Point3d::new(4.0, 3.0, -2.0),
            Point3d::new(1.0, 0.0, 0.5),
        ];
        let record = SummaryRecord::from_vertices("bunny", &vertices);

        assert_eq!(record.name, "bunny");
        assert_eq!(record.num_vertices, 3);
        assert_eq!((record.min_x, record.max_x), (0.0, 4.0));
        assert_eq!((record.min_y, record.max_y), (-1.5, 3.0));
        assert_eq!((record.min_z, record.max_z), (-2.0, 2.0));
        assert_eq!(
            record.values(),
            ["bunny", "3", "0.0", "4.0", "-1.5", "3.0", "-2.0", "2.0"].map(String::from)
        );
    }

    #[test]
    fn test_extents_are_written_as_floats() {
        assert_eq!(float_field(0.0), "0.0");
        assert_eq!(float_field(-0.125), "-0.125");
        assert_eq!(float_field(1e21), "1e21");
        assert_eq!(float_field(0.1 + 0.2), "0.30000000000000004");
    }
}
