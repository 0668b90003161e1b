use serde_derive::Serialize;

use crate::bbox::{BBox, Ltrb};
use crate::math::Centroid;

/// Read-only snapshot of one tracked pedestrian.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Track {
    pub track_id: u32,
    pub hits: u32,
    // in frames
    pub time_since_update: u64,
    /// Oldest first, newest last.
    pub history: Vec<Centroid>,
}

impl Track {
    #[inline]
    pub fn centroid(&self) -> Option<&Centroid> {
        self.history.last()
    }
}

/// What happened to one detection in a frame.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Assignment {
    pub bbox: BBox<Ltrb>,
    pub track_id: u32,
    pub is_new: bool,
    pub confidence: f32,
    pub label: String,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct FrameUpdate {
    pub frame_index: u64,
    pub assignments: Vec<Assignment>,
    pub new_tracks: u32,
    pub total_created: u32,
}

impl FrameUpdate {
    pub fn new_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.assignments
            .iter()
            .filter(|a| a.is_new)
            .map(|a| a.track_id)
    }
}
