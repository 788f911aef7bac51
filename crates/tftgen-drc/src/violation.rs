use serde::{Deserialize, Serialize};

use tftgen_core::geometry::BBox;
use tftgen_core::LayerId;

/// Type of DRC violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    MinWidth,
    MinSpacing,
    Enclosure,
}

/// Severity level of a DRC violation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
}

/// A single DRC violation with location and description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrcViolation {
    pub id: String,
    pub violation_type: ViolationType,
    pub severity: Severity,
    pub rule_name: String,
    pub message: String,
    pub layer_id: LayerId,
    /// Bounding box of the violation region: [min_x, min_y, max_x, max_y]
    pub bbox: [f64; 4],
    /// Indices of the flattened rectangles involved, per layer.
    pub geometry_indices: Vec<usize>,
}

impl DrcViolation {
    pub fn region(&self) -> BBox {
        BBox::from_corners(
            tftgen_core::Point::new(self.bbox[0], self.bbox[1]),
            tftgen_core::Point::new(self.bbox[2], self.bbox[3]),
        )
    }
}

pub(crate) fn bbox_array(bb: &BBox) -> [f64; 4] {
    [bb.min.x, bb.min.y, bb.max.x, bb.max.y]
}
