use super::debounce::Zone;
use super::{ExerciseKind, RepCounter, RepEvent, RepState, SingleAngleCore};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::pose::{AngleCalculator, JointTriple, LandmarkFrame};

/// スクワット: 見えている側の膝角度 (腰-膝-足首)
#[derive(Debug, Clone)]
pub struct SquatCounter {
    core: SingleAngleCore,
    calculator: AngleCalculator,
}

impl SquatCounter {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            core: SingleAngleCore::new(ExerciseKind::Squat, config, Zone::Extended),
            calculator: AngleCalculator::new(config.visibility_threshold),
        }
    }
}

impl RepCounter for SquatCounter {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::Squat
    }

    fn state(&self) -> &RepState {
        self.core.state()
    }

    fn try_update(&mut self, frame: &LandmarkFrame) -> Result<RepEvent> {
        let angle = self
            .calculator
            .most_visible_angle(frame, JointTriple::LEFT_KNEE)?;
        Ok(self.core.advance(angle, frame.index()))
    }

    fn reset(&mut self) {
        self.core.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::test_support::FrameBuilder;
    use crate::exercise::Stage;

    fn frame(index: u64, knee: f32, visibility: f32) -> LandmarkFrame {
        FrameBuilder::new()
            .leg(true, (0.45, 0.5), knee, visibility)
            .leg(false, (0.55, 0.5), knee, visibility)
            .build(index)
    }

    #[test]
    fn test_squat_reps() {
        let mut c = SquatCounter::from_config(&AnalysisConfig::default());
        let mut i = 0;
        for _ in 0..5 {
            for &knee in &[170.0, 170.0, 140.0, 85.0, 70.0, 70.0, 120.0, 165.0, 170.0] {
                c.update(&frame(i, knee, 0.9));
                i += 1;
            }
        }
        assert_eq!(c.state().rep_count, 5);
        assert_eq!(c.state().stage, Stage::Up);
    }

    #[test]
    fn test_shallow_squat_not_counted() {
        let mut c = SquatCounter::from_config(&AnalysisConfig::default());
        for (i, &knee) in [170.0, 170.0, 120.0, 100.0, 100.0, 120.0, 170.0, 170.0].iter().enumerate() {
            c.update(&frame(i as u64, knee, 0.9));
        }
        assert_eq!(c.state().rep_count, 0);
    }

    #[test]
    fn test_low_confidence_frame_is_skipped() {
        let mut c = SquatCounter::from_config(&AnalysisConfig::default());
        c.update(&frame(0, 170.0, 0.9));
        c.update(&frame(1, 170.0, 0.9));
        let before = c.state().clone();
        let result = c.try_update(&frame(2, 60.0, 0.3));
        assert!(matches!(
            result,
            Err(crate::error::AnalysisError::InsufficientConfidence { .. })
        ));
        assert_eq!(c.state(), &before);
    }
}
