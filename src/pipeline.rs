//! The frame loop: read, detect, track, report.
//!
//! Capture and inference stay behind the [`FrameSource`] and [`Detector`]
//! traits. Operator commands arrive through a [`Controller`] and are applied
//! between frames only, never while a frame is being associated.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::config::TrackerConfig;
use crate::detection::Detection;
use crate::error::Error;
use crate::frame::Frame;
use crate::session::Session;
use crate::track::FrameUpdate;

/// Maps one image to the detections found in it.
pub trait Detector<I> {
    fn detect(&mut self, image: &I) -> Result<Vec<Detection>, Error>;

    /// Get the detector name (for logging)
    fn name(&self) -> &str;
}

/// A stream of timestamped images; `Ok(None)` marks the end of the stream.
pub trait FrameSource {
    type Image;

    fn read(&mut self) -> Result<Option<(f32, Self::Image)>, Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Reset,
    Stop,
}

/// Cloneable operator handle, safe to use from another thread.
#[derive(Debug, Clone)]
pub struct Controller {
    tx: Sender<Command>,
}

impl Controller {
    pub fn reset(&self) {
        self.send(Command::Reset);
    }

    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    fn send(&self, cmd: Command) {
        if self.tx.send(cmd).is_err() {
            log::debug!("{:?} dropped, pipeline is gone", cmd);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub total_created: u32,
    pub stopped: bool,
}

pub struct Pipeline {
    session: Session,
    commands: Receiver<Command>,
}

impl Pipeline {
    pub fn new(config: TrackerConfig) -> Result<(Self, Controller), Error> {
        let session = Session::new(config)?;
        let (tx, commands) = unbounded();

        Ok((Self { session, commands }, Controller { tx }))
    }

    #[inline]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs one session over `source` until it ends or a stop command arrives.
    ///
    /// The session starts fresh and commands queued before the call are
    /// discarded. A read or detector failure aborts the run.
    pub fn run<S, D, F>(
        &mut self,
        source: &mut S,
        detector: &mut D,
        mut on_frame: F,
    ) -> Result<RunSummary, Error>
    where
        S: FrameSource,
        D: Detector<S::Image>,
        F: FnMut(&Frame, &FrameUpdate),
    {
        self.session = Session::with_config(self.session.config().clone());
        let discarded = self.commands.try_iter().count();
        if discarded > 0 {
            log::debug!("discarded {} commands queued before start", discarded);
        }

        let dims = self.session.config().frame_size;
        let mut summary = RunSummary {
            frames: 0,
            total_created: 0,
            stopped: false,
        };

        log::info!("run started with detector {}", detector.name());

        loop {
            for cmd in self.commands.try_iter() {
                match cmd {
                    Command::Reset => self.session.reset(),
                    Command::Stop => summary.stopped = true,
                }
            }

            if summary.stopped {
                break;
            }

            let (timestamp, image) = match source.read()? {
                Some(item) => item,
                None => break,
            };

            let detections = detector.detect(&image)?;
            let frame = Frame::new(dims, timestamp, detections);
            let update = self.session.update(&frame.detections);

            on_frame(&frame, &update);
            summary.frames += 1;
        }

        summary.total_created = self.session.total_created();

        log::info!(
            "run finished after {} frames: {} pedestrians{}",
            summary.frames,
            summary.total_created,
            if summary.stopped { " (stopped)" } else { "" }
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;
    use std::collections::VecDeque;

    struct Frames(VecDeque<Vec<(f32, f32)>>);

    impl FrameSource for Frames {
        type Image = Vec<(f32, f32)>;

        fn read(&mut self) -> Result<Option<(f32, Self::Image)>, Error> {
            Ok(self.0.pop_front().map(|img| (0.0, img)))
        }
    }

    struct Points;

    impl Detector<Vec<(f32, f32)>> for Points {
        fn detect(&mut self, image: &Vec<(f32, f32)>) -> Result<Vec<Detection>, Error> {
            Ok(image
                .iter()
                .map(|&(x, y)| {
                    Detection::new(BBox::ltrb(x - 8.0, y - 8.0, x + 8.0, y + 8.0), 0, 0.6)
                })
                .collect())
        }

        fn name(&self) -> &str {
            "points"
        }
    }

    struct Broken;

    impl Detector<Vec<(f32, f32)>> for Broken {
        fn detect(&mut self, _: &Vec<(f32, f32)>) -> Result<Vec<Detection>, Error> {
            Err(Error::Detector("model not loaded".into()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn frames(n: usize) -> Frames {
        Frames((0..n).map(|i| vec![(i as f32 * 100.0, 50.0)]).collect())
    }

    #[test]
    fn test_runs_to_end_of_stream() {
        let (mut pipeline, _ctl) = Pipeline::new(TrackerConfig::default()).unwrap();
        let mut seen = Vec::new();

        let summary = pipeline
            .run(&mut frames(4), &mut Points, |frame, update| {
                assert_eq!(frame.dims, (640, 360));
                seen.push(update.total_created);
            })
            .unwrap();

        assert_eq!(seen, vec![1, 2, 3, 4]);
        assert_eq!(
            summary,
            RunSummary {
                frames: 4,
                total_created: 4,
                stopped: false
            }
        );
    }

    #[test]
    fn test_stop_takes_effect_at_next_frame_boundary() {
        let (mut pipeline, ctl) = Pipeline::new(TrackerConfig::default()).unwrap();

        let summary = pipeline
            .run(&mut frames(10), &mut Points, |_, update| {
                if update.frame_index == 1 {
                    ctl.stop();
                }
            })
            .unwrap();

        assert!(summary.stopped);
        assert_eq!(summary.frames, 2);
        assert_eq!(pipeline.session().total_created(), 2);
    }

    #[test]
    fn test_reset_between_frames() {
        let (mut pipeline, ctl) = Pipeline::new(TrackerConfig::default()).unwrap();
        let source = vec![vec![(100.0, 100.0)], vec![(300.0, 100.0)], vec![(100.0, 100.0)]];
        let mut ids = Vec::new();

        let summary = pipeline
            .run(&mut Frames(source.into()), &mut Points, |_, update| {
                ids.push(update.assignments[0].track_id);
                if ids.len() == 2 {
                    ctl.reset();
                }
            })
            .unwrap();

        assert_eq!(ids, vec![0, 1, 0]);
        assert_eq!(summary.total_created, 1);
    }

    #[test]
    fn test_commands_before_run_are_discarded() {
        let (mut pipeline, ctl) = Pipeline::new(TrackerConfig::default()).unwrap();
        ctl.stop();

        let summary = pipeline.run(&mut frames(3), &mut Points, |_, _| {}).unwrap();

        assert!(!summary.stopped);
        assert_eq!(summary.frames, 3);
    }

    #[test]
    fn test_each_run_starts_fresh() {
        let (mut pipeline, _ctl) = Pipeline::new(TrackerConfig::default()).unwrap();

        pipeline.run(&mut frames(3), &mut Points, |_, _| {}).unwrap();
        let summary = pipeline.run(&mut frames(1), &mut Points, |_, _| {}).unwrap();

        assert_eq!(summary.total_created, 1);
    }

    #[test]
    fn test_detector_failure_aborts_run() {
        let (mut pipeline, _ctl) = Pipeline::new(TrackerConfig::default()).unwrap();

        let res = pipeline.run(&mut frames(3), &mut Broken, |_, _| {});

        assert!(matches!(res, Err(Error::Detector(_))));
    }

    #[test]
    fn test_controller_from_another_thread() {
        let (mut pipeline, ctl) = Pipeline::new(TrackerConfig::default()).unwrap();

        std::thread::spawn(move || ctl.stop()).join().unwrap();
        let summary = pipeline.run(&mut frames(2), &mut Points, |_, _| {}).unwrap();

        // queued before the run, so it is dropped
        assert_eq!(summary.frames, 2);
    }
}
