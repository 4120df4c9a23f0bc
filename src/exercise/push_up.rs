use super::debounce::Zone;
use super::{ExerciseKind, RepCounter, RepEvent, RepState, SingleAngleCore};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::pose::{AngleCalculator, JointTriple, LandmarkFrame};

/// 腕立て伏せ: 見えている側の肘角度
///
/// 横から撮ると奥側の腕は隠れるので、可視性の高い側を使う。
#[derive(Debug, Clone)]
pub struct PushUpCounter {
    core: SingleAngleCore,
    calculator: AngleCalculator,
}

impl PushUpCounter {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            // 腕を伸ばしきった側が Up
            core: SingleAngleCore::new(ExerciseKind::PushUp, config, Zone::Extended),
            calculator: AngleCalculator::new(config.visibility_threshold),
        }
    }
}

impl RepCounter for PushUpCounter {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::PushUp
    }

    fn state(&self) -> &RepState {
        self.core.state()
    }

    fn try_update(&mut self, frame: &LandmarkFrame) -> Result<RepEvent> {
        let angle = self
            .calculator
            .most_visible_angle(frame, JointTriple::LEFT_ELBOW)?;
        Ok(self.core.advance(angle, frame.index()))
    }

    fn reset(&mut self) {
        self.core.reset();
    }
}
