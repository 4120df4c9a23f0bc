//! Heuristic exercise classifier
//!
//! Each exercise has an expected profile (torso posture, which joint moves,
//! where the wrists are). Window features are matched against every profile
//! and the scores normalized to sum to 1.

pub mod features;
pub mod window;

use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::exercise::ExerciseKind;
use crate::pose::{AngleCalculator, LandmarkFrame};

pub use features::WindowFeatures;
pub use window::FrameWindow;

/// Uniform floor added to every raw score before normalizing. With no
/// motion at all every exercise ends up at exactly 1/4.
const BASELINE: f32 = 0.02;

/// Best and runner-up closer than this count as a tie
const TIE_EPSILON: f32 = 1e-3;

/// Windows with fewer usable frames than this carry no opinion
const MIN_USABLE_FRACTION: f32 = 0.5;

/// Normalized per-exercise scores for one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationScore {
    scores: [(ExerciseKind, f32); 4],
}

impl ClassificationScore {
    /// Normalize raw scores to sum to 1
    fn from_raw(raw: [f32; 4]) -> Self {
        let raw = raw.map(|r| r.max(0.0) + BASELINE);
        let total: f32 = raw.iter().sum();
        let mut scores = [(ExerciseKind::BicepCurl, 0.0); 4];
        for (i, kind) in ExerciseKind::ALL.iter().enumerate() {
            scores[i] = (*kind, raw[i] / total);
        }
        Self { scores }
    }

    fn uniform() -> Self {
        Self::from_raw([0.0; 4])
    }

    pub fn get(&self, kind: ExerciseKind) -> f32 {
        self.scores
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0.0, |(_, s)| *s)
    }

    pub fn scores(&self) -> &[(ExerciseKind, f32); 4] {
        &self.scores
    }

    /// Highest-scoring exercise
    pub fn best(&self) -> (ExerciseKind, f32) {
        self.scores
            .iter()
            .copied()
            .fold(self.scores[0], |best, s| if s.1 > best.1 { s } else { best })
    }

    /// `Unknown` when the best score is under `floor` or tied with the
    /// runner-up
    pub fn outcome(&self, floor: f32) -> Classification {
        let (kind, best) = self.best();
        let runner_up = self
            .scores
            .iter()
            .filter(|(k, _)| *k != kind)
            .map(|(_, s)| *s)
            .fold(0.0, f32::max);
        if best < floor || best - runner_up < TIE_EPSILON {
            Classification::Unknown
        } else {
            Classification::Exercise {
                kind,
                confidence: best,
            }
        }
    }
}

/// Classifier decision for one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Classification {
    Exercise { kind: ExerciseKind, confidence: f32 },
    Unknown,
}

impl Classification {
    pub fn kind(&self) -> Option<ExerciseKind> {
        match self {
            Classification::Exercise { kind, .. } => Some(*kind),
            Classification::Unknown => None,
        }
    }
}

/// 0 at `lo`, 1 at `hi`, linear in between
fn ramp(value: f32, lo: f32, hi: f32) -> f32 {
    ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
}

#[derive(Debug, Clone)]
pub struct ExerciseClassifier {
    calculator: AngleCalculator,
    floor: f32,
}

impl ExerciseClassifier {
    pub fn new(min_visibility: f32, floor: f32) -> Self {
        Self {
            calculator: AngleCalculator::new(min_visibility),
            floor,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.visibility_threshold, config.classifier_confidence_floor)
    }

    pub fn floor(&self) -> f32 {
        self.floor
    }

    pub fn classify(&self, window: &[LandmarkFrame]) -> ClassificationScore {
        let features = WindowFeatures::extract(window, &self.calculator);
        Self::score(&features)
    }

    /// 1フレームが分類に使えるか (胴体と肘か膝の角度が取れる)
    pub fn is_usable(&self, frame: &LandmarkFrame) -> bool {
        features::frame_usable(frame, &self.calculator)
    }

    /// `classify` followed by the floor/tie check
    pub fn evaluate(&self, window: &[LandmarkFrame]) -> Classification {
        self.classify(window).outcome(self.floor)
    }

    /// Profile matching. Order of the raw array follows `ExerciseKind::ALL`.
    pub fn score(f: &WindowFeatures) -> ClassificationScore {
        if f.usable_fraction < MIN_USABLE_FRACTION {
            return ClassificationScore::uniform();
        }

        let upright = 1.0 - ramp(f.torso_tilt_deg, 35.0, 55.0);
        let horizontal = ramp(f.torso_tilt_deg, 50.0, 70.0);
        let elbow_motion = ramp(f.elbow_range_deg, 25.0, 60.0);
        let knee_motion = ramp(f.knee_range_deg, 25.0, 60.0);
        let knee_still = 1.0 - knee_motion;
        let overhead = ramp(f.wrists_overhead, 0.3, 0.7);

        let curl = upright * elbow_motion * knee_still * (1.0 - overhead);
        let push_up = horizontal * elbow_motion;
        let squat = upright * knee_motion;
        let press = upright * elbow_motion * knee_still * overhead;

        ClassificationScore::from_raw([curl, push_up, squat, press])
    }
}
