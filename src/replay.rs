//! Replays recorded detections, one frame per line: `<timestamp>:<json array>`.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::detection::Detection;
use crate::error::Error;
use crate::pipeline::{Detector, FrameSource};

pub struct DetectionsReader<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl DetectionsReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|err| Error::SourceUnavailable(format!("{}: {}", path.display(), err)))?;

        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> DetectionsReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }

    fn parse_line(&self, line: &str) -> Option<(f32, Vec<Detection>)> {
        let idx = match line.find(':') {
            Some(idx) => idx,
            None => {
                log::warn!("line {}: wrong file format: expected `:`", self.line_no);
                return None;
            }
        };

        let (ts, vector) = line.split_at(idx);

        let ts = match ts.trim().parse::<f32>() {
            Ok(ts) => ts,
            Err(_) => {
                log::warn!("line {}: wrong file format: parse timestamp failed", self.line_no);
                return None;
            }
        };

        let values: Vec<serde_json::Value> = match serde_json::from_str(&vector[1..]) {
            Ok(values) => values,
            Err(err) => {
                log::warn!("line {}: wrong file format: {}", self.line_no, err);
                return None;
            }
        };

        let detections = values
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<Detection>(value) {
                Ok(det) => Some(det),
                Err(err) => {
                    log::warn!("line {}: skipping detection: {}", self.line_no, err);
                    None
                }
            })
            .collect();

        Some((ts, detections))
    }
}

impl<R: BufRead> FrameSource for DetectionsReader<R> {
    type Image = Vec<Detection>;

    fn read(&mut self) -> Result<Option<(f32, Self::Image)>, Error> {
        loop {
            let line = match self.lines.next() {
                Some(line) => line?,
                None => return Ok(None),
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            if let Some(frame) = self.parse_line(&line) {
                return Ok(Some(frame));
            }
        }
    }
}

/// Hands recorded detections through unchanged.
#[derive(Debug, Default)]
pub struct ReplayDetector;

impl Detector<Vec<Detection>> for ReplayDetector {
    #[inline]
    fn detect(&mut self, image: &Vec<Detection>) -> Result<Vec<Detection>, Error> {
        Ok(image.clone())
    }

    fn name(&self) -> &str {
        "replay"
    }
}
