pub mod bbox;
pub mod circular_queue;
pub mod config;
pub mod detection;
pub mod error;
pub mod frame;
pub mod math;
pub mod pipeline;
pub mod replay;
pub mod session;
pub mod track;

pub use config::{MatchPolicy, TrackerConfig};
pub use detection::Detection;
pub use frame::Frame;
pub use session::Session;
pub use track::{Assignment, FrameUpdate, Track};

use error::Error;
use std::collections::HashMap;
use std::rc::Rc;

pub trait Tracking {
    fn update(&mut self, frame: &Frame, src: &str) -> FrameUpdate;
    fn reset(&mut self, src: &str);
    fn total_created(&self, src: &str) -> u32;
    fn tracks(&self, src: &str) -> Rc<[Track]>;
}

/// Keeps one independent [`Session`] per video source.
pub struct CentroidTracker {
    config: TrackerConfig,
    sessions: HashMap<String, Session>,
}

impl CentroidTracker {
    pub fn new(config: TrackerConfig) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            config,
            sessions: HashMap::new(),
        })
    }

    /// Begins a fresh session for `src`, replacing any previous one.
    pub fn start(&mut self, src: &str) {
        self.sessions
            .insert(src.to_string(), Session::with_config(self.config.clone()));
    }

    /// Ends the session for `src` and hands back its final state.
    pub fn stop(&mut self, src: &str) -> Option<Session> {
        self.sessions.remove(src)
    }

    #[inline]
    pub fn session(&self, src: &str) -> Option<&Session> {
        self.sessions.get(src)
    }
}

impl Default for CentroidTracker {
    fn default() -> Self {
        Self {
            config: TrackerConfig::default(),
            sessions: HashMap::new(),
        }
    }
}

impl crate::Tracking for CentroidTracker {
    fn update(&mut self, frame: &Frame, src: &str) -> FrameUpdate {
        let config = &self.config;
        let session = self
            .sessions
            .entry(src.to_string())
            .or_insert_with(|| Session::with_config(config.clone()));

        session.update(&frame.detections)
    }

    fn reset(&mut self, src: &str) {
        if let Some(session) = self.sessions.get_mut(src) {
            session.reset();
        }
    }

    #[inline]
    fn total_created(&self, src: &str) -> u32 {
        self.sessions
            .get(src)
            .map(Session::total_created)
            .unwrap_or(0)
    }

    #[inline]
    fn tracks(&self, src: &str) -> Rc<[Track]> {
        if let Some(session) = self.sessions.get(src) {
            return session.tracks().into_boxed_slice().into();
        }

        Rc::new([])
    }
}
