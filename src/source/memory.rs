use std::collections::VecDeque;

use super::{FrameSource, SourceError};
use crate::pose::LandmarkFrame;

/// 記録済みフレームを順に返すソース
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    frames: VecDeque<LandmarkFrame>,
    released: bool,
}

impl MemorySource {
    pub fn new(frames: impl IntoIterator<Item = LandmarkFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            released: false,
        }
    }

    /// まだ返していないフレーム数
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError> {
        if self.released {
            return Ok(None);
        }
        Ok(self.frames.pop_front())
    }

    fn release(&mut self) {
        self.released = true;
        self.frames.clear();
    }
}

impl FromIterator<LandmarkFrame> for MemorySource {
    fn from_iter<I: IntoIterator<Item = LandmarkFrame>>(iter: I) -> Self {
        Self::new(iter)
    }
}
