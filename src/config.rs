use serde_derive::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Error;

/// COCO "person".
pub const PEDESTRIAN_CLASS: i32 = 0;
pub const MATCH_THRESHOLD: i32 = 50;
pub const HISTORY_LEN: usize = 30;
pub const FRAME_SIZE: (u32, u32) = (640, 360);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Tracks are scanned in creation order and the first one in range wins.
    FirstFit,
    /// One-to-one assignment minimising centroid distance.
    BestFit,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        MatchPolicy::FirstFit
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    pub target_class: i32,
    /// Per-axis pixel distance, compared with a strict `<`.
    pub match_threshold: i32,
    pub history_len: usize,
    pub policy: MatchPolicy,
    /// Drop tracks left unmatched for more than this many frames.
    pub max_missing_frames: Option<u32>,
    /// Evict the least recently updated track when a new one would exceed this.
    ///
    /// Tracks unseen in the current frame go first. When every live track was
    /// already observed in this frame, one of them is still evicted, so the
    /// frame's `FrameUpdate` may name an id that is no longer live.
    pub max_tracks: Option<usize>,
    pub frame_size: (u32, u32),
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            target_class: PEDESTRIAN_CLASS,
            match_threshold: MATCH_THRESHOLD,
            history_len: HISTORY_LEN,
            policy: MatchPolicy::FirstFit,
            max_missing_frames: None,
            max_tracks: None,
            frame_size: FRAME_SIZE,
        }
    }
}

impl TrackerConfig {
    pub fn from_json(src: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(src)?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let src = std::fs::read_to_string(path)?;

        Self::from_json(&src)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.match_threshold <= 0 {
            return Err(Error::InvalidConfig(format!(
                "match_threshold must be positive, got {}",
                self.match_threshold
            )));
        }

        if self.history_len == 0 {
            return Err(Error::InvalidConfig("history_len must be at least 1".into()));
        }

        if self.max_tracks == Some(0) {
            return Err(Error::InvalidConfig("max_tracks must be at least 1".into()));
        }

        let (w, h) = self.frame_size;
        if w == 0 || h == 0 {
            return Err(Error::InvalidConfig(format!(
                "frame_size must be non-empty, got {}x{}",
                w, h
            )));
        }

        Ok(())
    }
}
