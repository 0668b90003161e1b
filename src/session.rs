use crate::circular_queue::CircularQueue;
use crate::config::{MatchPolicy, TrackerConfig};
use crate::detection::{self, Detection};
use crate::error::Error;
use crate::math::{self, Centroid};
use crate::track::{Assignment, FrameUpdate, Track};

use munkres::{solve_assignment, WeightMatrix};

#[derive(Debug, Clone)]
pub struct Participant {
    pub id: u32,
    pub hits: u32,
    pub last_seen: u64,
    pub time_since_update: u64,
    pub history: CircularQueue<Centroid>,
}

impl Participant {
    pub fn new(id: u32, frame: u64, centroid: Centroid, history_len: usize) -> Self {
        let mut history = CircularQueue::with_capacity(history_len);
        history.push(centroid);

        Self {
            id,
            hits: 1,
            last_seen: frame,
            time_since_update: 0,
            history,
        }
    }

    pub fn update(&mut self, frame: u64, centroid: Centroid) {
        self.history.push(centroid);
        self.hits += 1;
        self.last_seen = frame;
        self.time_since_update = 0;
    }

    #[inline]
    pub fn centroid(&self) -> Option<&Centroid> {
        self.history.latest()
    }

    #[inline]
    fn is_near(&self, centroid: &Centroid, threshold: i32) -> bool {
        self.centroid()
            .map_or(false, |last| math::within(last, centroid, threshold))
    }
}

impl From<&Participant> for Track {
    fn from(p: &Participant) -> Track {
        Track {
            track_id: p.id,
            hits: p.hits,
            time_since_update: p.time_since_update,
            history: p.history.iter().copied().collect(),
        }
    }
}

/// All tracking state of one continuous run over one video source.
///
/// Tracks are kept in creation order, which is also the scan order of
/// first-fit matching.
#[derive(Debug, Clone)]
pub struct Session {
    config: TrackerConfig,
    participants: Vec<Participant>,
    next_id: u32,
    total_created: u32,
    frame_index: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::with_config(TrackerConfig::default())
    }
}

impl Session {
    pub fn new(config: TrackerConfig) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self::with_config(config))
    }

    pub(crate) fn with_config(config: TrackerConfig) -> Self {
        Self {
            config,
            participants: Vec::with_capacity(32),
            next_id: 0,
            total_created: 0,
            frame_index: 0,
        }
    }

    #[inline]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Filters one frame's raw detections down to the target class and
    /// associates them with the current tracks.
    pub fn update(&mut self, detections: &[Detection]) -> FrameUpdate {
        let pedestrians = detection::filter_class(detections, self.config.target_class);

        self.associate(&pedestrians)
    }

    /// Associates already filtered detections, in order, with the current tracks.
    pub fn associate(&mut self, detections: &[Detection]) -> FrameUpdate {
        let frame = self.frame_index;

        let observed: Vec<(&Detection, Centroid)> = detections
            .iter()
            .filter_map(|det| match det.centroid() {
                Some(centroid) => Some((det, centroid)),
                None => {
                    log::warn!("frame {}: skipping malformed detection {:?}", frame, det);
                    None
                }
            })
            .collect();

        let plan = match self.config.policy {
            MatchPolicy::FirstFit => None,
            MatchPolicy::BestFit => {
                let centroids: Vec<Centroid> = observed.iter().map(|&(_, c)| c).collect();
                self.best_fit(&centroids)
            }
        };

        let targets = self.apply(frame, &observed, plan);

        let mut update = FrameUpdate {
            frame_index: frame,
            ..Default::default()
        };

        for (&(det, _), (track_id, is_new)) in observed.iter().zip(targets) {
            if is_new {
                update.new_tracks += 1;
            }

            update.assignments.push(Assignment {
                bbox: det.bbox,
                track_id,
                is_new,
                confidence: det.confidence,
                label: det.label(),
            });
        }

        for p in &mut self.participants {
            p.time_since_update = frame - p.last_seen;
        }

        if let Some(max_missing) = self.config.max_missing_frames {
            let before = self.participants.len();
            self.participants
                .retain(|p| p.time_since_update <= max_missing as u64);

            let dropped = before - self.participants.len();
            if dropped > 0 {
                log::debug!("frame {}: dropped {} stale tracks", frame, dropped);
            }
        }

        self.frame_index += 1;
        update.total_created = self.total_created;

        update
    }

    /// Without a plan, falls back to first-fit.
    fn apply(
        &mut self,
        frame: u64,
        observed: &[(&Detection, Centroid)],
        plan: Option<Vec<Option<usize>>>,
    ) -> Vec<(u32, bool)> {
        match plan {
            Some(plan) => self.apply_plan(frame, observed, plan),
            None => self.apply_first_fit(frame, observed),
        }
    }

    /// Every detection sees the tracks created or moved by the ones before it.
    fn apply_first_fit(&mut self, frame: u64, observed: &[(&Detection, Centroid)]) -> Vec<(u32, bool)> {
        let threshold = self.config.match_threshold;
        let mut targets = Vec::with_capacity(observed.len());

        for &(_, centroid) in observed {
            let found = self
                .participants
                .iter()
                .position(|p| p.is_near(&centroid, threshold));

            targets.push(match found {
                Some(idx) => {
                    let p = &mut self.participants[idx];
                    p.update(frame, centroid);
                    (p.id, false)
                }
                None => (self.create(frame, centroid), true),
            });
        }

        targets
    }

    /// Matches are applied before any track is created, so capacity
    /// eviction can not invalidate planned indexes.
    fn apply_plan(
        &mut self,
        frame: u64,
        observed: &[(&Detection, Centroid)],
        plan: Vec<Option<usize>>,
    ) -> Vec<(u32, bool)> {
        let mut targets = vec![(0, false); observed.len()];

        for (i, idx) in plan.iter().enumerate() {
            if let Some(idx) = *idx {
                let p = &mut self.participants[idx];
                p.update(frame, observed[i].1);
                targets[i] = (p.id, false);
            }
        }

        for (i, idx) in plan.iter().enumerate() {
            if idx.is_none() {
                targets[i] = (self.create(frame, observed[i].1), true);
            }
        }

        targets
    }

    /// One-to-one assignment of centroids to tracks in range, minimising the
    /// Chebyshev distance. Returns `None` if the solver fails.
    fn best_fit(&self, centroids: &[Centroid]) -> Option<Vec<Option<usize>>> {
        let threshold = self.config.match_threshold;
        let mut plan = vec![None; centroids.len()];

        let candidates: Vec<usize> = self
            .participants
            .iter()
            .enumerate()
            .filter(|(_, p)| centroids.iter().any(|c| p.is_near(c, threshold)))
            .map(|(idx, _)| idx)
            .collect();

        if candidates.is_empty() {
            return Some(plan);
        }

        let n = candidates.len().max(centroids.len());

        // above the cost of any n in-range pairs together
        let unreachable = threshold as f64 * (n as f64 + 1.0);

        let mut in_range = vec![false; n * n];
        let mut costs = vec![unreachable; n * n];

        for (r, &idx) in candidates.iter().enumerate() {
            let p = &self.participants[idx];
            let last = match p.centroid() {
                Some(last) => last,
                None => continue,
            };

            for (c, centroid) in centroids.iter().enumerate() {
                if math::within(last, centroid, threshold) {
                    in_range[r * n + c] = true;
                    costs[r * n + c] = math::chebyshev(last, centroid) as f64;
                }
            }
        }

        let mut weights = WeightMatrix::from_row_vec(n, costs);

        match solve_assignment(&mut weights) {
            Ok(positions) => {
                for pos in positions {
                    if in_range[pos.row * n + pos.column] {
                        plan[pos.column] = Some(candidates[pos.row]);
                    }
                }

                Some(plan)
            }
            Err(err) => {
                log::warn!(
                    "frame {}: assignment could not be solved ({:?}), using first-fit",
                    self.frame_index,
                    err
                );

                None
            }
        }
    }

    fn create(&mut self, frame: u64, centroid: Centroid) -> u32 {
        if let Some(cap) = self.config.max_tracks {
            while self.participants.len() >= cap {
                self.evict_least_recent();
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        self.total_created += 1;

        self.participants
            .push(Participant::new(id, frame, centroid, self.config.history_len));

        log::debug!(
            "frame {}: new track {} at ({}, {})",
            frame,
            id,
            centroid.x,
            centroid.y
        );

        id
    }

    // ties go to the earliest created track
    fn evict_least_recent(&mut self) {
        let oldest = self
            .participants
            .iter()
            .enumerate()
            .min_by_key(|(_, p)| p.last_seen)
            .map(|(idx, _)| idx);

        if let Some(idx) = oldest {
            let p = self.participants.remove(idx);
            log::debug!("track {} evicted at capacity", p.id);
        }
    }

    /// Discards every track and zeroes all counters.
    pub fn reset(&mut self) {
        log::info!(
            "session reset: {} tracks discarded, {} created so far",
            self.participants.len(),
            self.total_created
        );

        self.participants.clear();
        self.next_id = 0;
        self.total_created = 0;
        self.frame_index = 0;
    }

    /// Count of distinct pedestrians observed since start or last reset.
    #[inline]
    pub fn total_created(&self) -> u32 {
        self.total_created
    }

    #[inline]
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn track(&self, id: u32) -> Option<Track> {
        self.participants
            .iter()
            .find(|p| p.id == id)
            .map(Into::into)
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.participants.iter().map(Into::into).collect()
    }
}
