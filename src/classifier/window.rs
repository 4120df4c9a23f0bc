//! Sliding frame window for classification
//!
//! Keeps the last `capacity` frames in arrival order.

use std::collections::VecDeque;

use crate::pose::LandmarkFrame;

#[derive(Debug, Clone)]
pub struct FrameWindow {
    frames: VecDeque<LandmarkFrame>,
    capacity: usize,
}

impl FrameWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a frame, dropping the oldest one when full
    pub fn push(&mut self, frame: LandmarkFrame) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// Window has `capacity` frames (ready for classification)
    pub fn is_full(&self) -> bool {
        self.frames.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames oldest first, as one contiguous slice
    pub fn frames(&mut self) -> &[LandmarkFrame] {
        self.frames.make_contiguous()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
