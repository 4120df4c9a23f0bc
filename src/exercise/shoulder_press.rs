use super::debounce::Zone;
use super::{ExerciseKind, RepCounter, RepEvent, RepState, SingleAngleCore};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::pose::{AngleCalculator, JointTriple, LandmarkFrame};

/// ショルダープレス: 両肘角度の平均
///
/// 両腕が同時に動くので片側だけのノイズを平均で抑える。片腕しか
/// 見えないときはその腕だけを使う。
#[derive(Debug, Clone)]
pub struct ShoulderPressCounter {
    core: SingleAngleCore,
    calculator: AngleCalculator,
}

impl ShoulderPressCounter {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            core: SingleAngleCore::new(ExerciseKind::ShoulderPress, config, Zone::Extended),
            calculator: AngleCalculator::new(config.visibility_threshold),
        }
    }
}

impl RepCounter for ShoulderPressCounter {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::ShoulderPress
    }

    fn state(&self) -> &RepState {
        self.core.state()
    }

    fn try_update(&mut self, frame: &LandmarkFrame) -> Result<RepEvent> {
        let angle = self
            .calculator
            .mean_angle(frame, &[JointTriple::LEFT_ELBOW, JointTriple::RIGHT_ELBOW])?;
        Ok(self.core.advance(angle, frame.index()))
    }

    fn reset(&mut self) {
        self.core.reset();
    }
}
