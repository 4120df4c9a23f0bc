//! Synthetic pose helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fitvision::pose::{Landmark, LandmarkFrame, LandmarkIndex};
use fitvision::source::{FrameSource, SourceError};

pub const HIDDEN: f32 = 0.1;
pub const SEEN: f32 = 0.9;

/// Point at `length` from `origin`, `degrees` clockwise from straight down.
fn offset(origin: (f32, f32), degrees: f32, length: f32) -> (f32, f32) {
    let r = degrees.to_radians();
    (origin.0 + length * r.sin(), origin.1 + length * r.cos())
}

pub struct Pose {
    landmarks: [Landmark; LandmarkIndex::COUNT],
}

impl Pose {
    pub fn new() -> Self {
        Self {
            landmarks: [Landmark::default(); LandmarkIndex::COUNT],
        }
    }

    pub fn set(mut self, idx: LandmarkIndex, p: (f32, f32), visibility: f32) -> Self {
        self.landmarks[idx as usize] = Landmark::new(p.0, p.1, 0.0, visibility);
        self
    }

    /// Upper arm hanging straight down, forearm folding up by `elbow`.
    pub fn arm(self, left: bool, shoulder: (f32, f32), elbow: f32, visibility: f32) -> Self {
        use LandmarkIndex::*;
        let (s, e, w) = if left {
            (LeftShoulder, LeftElbow, LeftWrist)
        } else {
            (RightShoulder, RightElbow, RightWrist)
        };
        let elbow_pos = offset(shoulder, 0.0, 0.15);
        let wrist = offset(elbow_pos, 180.0 - elbow, 0.15);
        self.set(s, shoulder, visibility)
            .set(e, elbow_pos, visibility)
            .set(w, wrist, visibility)
    }

    /// Thigh straight down from `hip`, shin folding by `knee`.
    pub fn leg(self, left: bool, hip: (f32, f32), knee: f32, visibility: f32) -> Self {
        use LandmarkIndex::*;
        let (h, k, a) = if left {
            (LeftHip, LeftKnee, LeftAnkle)
        } else {
            (RightHip, RightKnee, RightAnkle)
        };
        let knee_pos = offset(hip, 0.0, 0.2);
        let ankle = offset(knee_pos, 180.0 - knee, 0.2);
        self.set(h, hip, visibility)
            .set(k, knee_pos, visibility)
            .set(a, ankle, visibility)
    }

    /// Standing body with both arms at `elbow` and both legs at `knee`.
    pub fn standing(elbow: f32, knee: f32) -> Self {
        Self::new()
            .arm(true, (0.45, 0.3), elbow, SEEN)
            .arm(false, (0.55, 0.3), elbow, SEEN)
            .leg(true, (0.45, 0.6), knee, SEEN)
            .leg(false, (0.55, 0.6), knee, SEEN)
    }

    pub fn build(self, index: u64) -> LandmarkFrame {
        LandmarkFrame::new(index, index * 33, self.landmarks)
    }
}

/// Angle oscillating between `lo` and `hi` with a 20-frame period.
pub fn wave(i: u64, lo: f32, hi: f32) -> f32 {
    let phase = (i % 20) as f32 / 20.0 * std::f32::consts::TAU;
    lo + (hi - lo) * (0.5 + 0.5 * phase.cos())
}

/// Squatting with arms hanging.
pub fn squat_frame(i: u64) -> LandmarkFrame {
    Pose::standing(170.0, wave(i, 70.0, 170.0)).build(i)
}

/// Curling both arms while standing still.
pub fn curl_frame(i: u64) -> LandmarkFrame {
    Pose::standing(wave(i, 30.0, 170.0), 175.0).build(i)
}

/// Source yielding `limit` blank frames (forever when `None`), then ending
/// or failing. Counts how often it was released.
pub struct CountingSource {
    next: u64,
    limit: Option<u64>,
    fail_at_end: bool,
    released: Arc<AtomicUsize>,
}

impl CountingSource {
    pub fn new(limit: Option<u64>) -> (Self, Arc<AtomicUsize>) {
        let released = Arc::new(AtomicUsize::new(0));
        let source = Self {
            next: 0,
            limit,
            fail_at_end: false,
            released: Arc::clone(&released),
        };
        (source, released)
    }

    pub fn failing(limit: u64) -> (Self, Arc<AtomicUsize>) {
        let (mut source, released) = Self::new(Some(limit));
        source.fail_at_end = true;
        (source, released)
    }
}

impl FrameSource for CountingSource {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError> {
        if self.limit.is_some_and(|l| self.next >= l) {
            return if self.fail_at_end {
                Err(SourceError::Device("camera unplugged".into()))
            } else {
                Ok(None)
            };
        }
        let frame = Pose::standing(170.0, 175.0).build(self.next);
        self.next += 1;
        Ok(Some(frame))
    }

    fn release(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn release_count(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}
