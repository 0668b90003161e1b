use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::math::{self, Centroid};

/// One detector output for one frame: corner box, class id and confidence.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BBox<Ltrb>,
    #[serde(rename = "c")]
    pub class: i32,
    #[serde(rename = "p")]
    pub confidence: f32,
}

impl Detection {
    #[inline]
    pub fn new(bbox: BBox<Ltrb>, class: i32, confidence: f32) -> Self {
        Self {
            bbox,
            class,
            confidence,
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.bbox.is_finite() && self.confidence.is_finite()
    }

    /// Integer midpoint of the truncated box, `None` for malformed detections.
    pub fn centroid(&self) -> Option<Centroid> {
        if !self.is_valid() {
            return None;
        }

        Some(math::centroid(self.bbox.to_int()))
    }

    #[inline]
    pub fn label(&self) -> String {
        format!("Person {:.2}", self.confidence)
    }
}

/// Detections whose class equals `class`, in input order.
pub fn filter_class(detections: &[Detection], class: i32) -> Vec<Detection> {
    detections
        .iter()
        .filter(|det| det.class == class)
        .copied()
        .collect()
}
