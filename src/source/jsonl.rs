//! JSON Lines landmark recordings
//!
//! One frame per line:
//!
//! ```text
//! {"index": 0, "timestamp_ms": 0, "landmarks": [[x, y, z, visibility], ...]}
//! ```
//!
//! `landmarks` must hold exactly 33 entries in BlazePose order. Blank lines
//! are ignored. A missing `timestamp_ms` is derived from the index at 30 fps.

use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{FrameSource, SourceError};
use crate::pose::{Landmark, LandmarkFrame, LandmarkIndex};

const ASSUMED_FPS: u64 = 30;

#[derive(Debug, Deserialize)]
struct FrameRecord {
    index: u64,
    #[serde(default)]
    timestamp_ms: Option<u64>,
    landmarks: Vec<[f32; 4]>,
}

pub struct JsonlSource {
    reader: Option<Box<dyn BufRead + Send>>,
    line: usize,
    buf: String,
}

impl JsonlSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let file = File::open(path.as_ref())?;
        Ok(Self::from_reader(BufReader::new(file)))
    }

    pub fn from_reader(reader: impl BufRead + Send + 'static) -> Self {
        Self {
            reader: Some(Box::new(reader)),
            line: 0,
            buf: String::new(),
        }
    }

    /// 最後に読んだ行番号 (1始まり)
    pub fn line(&self) -> usize {
        self.line
    }

    fn parse(&self, text: &str) -> Result<LandmarkFrame, SourceError> {
        let record: FrameRecord = serde_json::from_str(text).map_err(|source| SourceError::Parse {
            line: self.line,
            source,
        })?;
        if record.landmarks.len() != LandmarkIndex::COUNT {
            return Err(SourceError::Malformed {
                line: self.line,
                reason: format!(
                    "expected {} landmarks, got {}",
                    LandmarkIndex::COUNT,
                    record.landmarks.len()
                ),
            });
        }
        let landmarks: Vec<Landmark> = record
            .landmarks
            .iter()
            .map(|&[x, y, z, v]| Landmark::new(x, y, z, v))
            .collect();
        let timestamp_ms = match record.timestamp_ms {
            Some(ts) => ts,
            None => record
                .index
                .checked_mul(1000)
                .map(|ms| ms / ASSUMED_FPS)
                .ok_or_else(|| SourceError::Malformed {
                    line: self.line,
                    reason: format!("cannot derive timestamp from index {}", record.index),
                })?,
        };
        LandmarkFrame::from_slice(record.index, timestamp_ms, &landmarks).ok_or_else(|| {
            SourceError::Malformed {
                line: self.line,
                reason: "landmark count mismatch".into(),
            }
        })
    }
}

impl FrameSource for JsonlSource {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError> {
        loop {
            let Some(reader) = self.reader.as_mut() else {
                return Ok(None);
            };
            self.buf.clear();
            if reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }
            return self.parse(text).map(Some);
        }
    }

    fn release(&mut self) {
        self.reader = None;
    }
}
