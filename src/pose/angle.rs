//! Joint angle calculation using the dot product
//!
//! Angles are measured on the (x, y) image projection only. The depth
//! estimate from the pose model is too noisy to help.

use serde::Serialize;

use super::landmark::{Landmark, LandmarkFrame, LandmarkIndex};
use crate::error::{AnalysisError, Result};

/// Default minimum landmark visibility for a usable angle
pub const DEFAULT_MIN_VISIBILITY: f32 = 0.5;

/// Three landmarks forming an angle at `vertex`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointTriple {
    pub a: LandmarkIndex,
    pub vertex: LandmarkIndex,
    pub c: LandmarkIndex,
}

impl JointTriple {
    pub const LEFT_ELBOW: Self = Self::new(
        LandmarkIndex::LeftShoulder,
        LandmarkIndex::LeftElbow,
        LandmarkIndex::LeftWrist,
    );
    pub const RIGHT_ELBOW: Self = Self::new(
        LandmarkIndex::RightShoulder,
        LandmarkIndex::RightElbow,
        LandmarkIndex::RightWrist,
    );
    pub const LEFT_KNEE: Self = Self::new(
        LandmarkIndex::LeftHip,
        LandmarkIndex::LeftKnee,
        LandmarkIndex::LeftAnkle,
    );
    pub const RIGHT_KNEE: Self = Self::new(
        LandmarkIndex::RightHip,
        LandmarkIndex::RightKnee,
        LandmarkIndex::RightAnkle,
    );
    pub const LEFT_HIP: Self = Self::new(
        LandmarkIndex::LeftShoulder,
        LandmarkIndex::LeftHip,
        LandmarkIndex::LeftKnee,
    );
    pub const RIGHT_HIP: Self = Self::new(
        LandmarkIndex::RightShoulder,
        LandmarkIndex::RightHip,
        LandmarkIndex::RightKnee,
    );

    pub const fn new(a: LandmarkIndex, vertex: LandmarkIndex, c: LandmarkIndex) -> Self {
        Self { a, vertex, c }
    }

    pub fn landmarks(&self) -> [LandmarkIndex; 3] {
        [self.a, self.vertex, self.c]
    }

    /// Same joint on the other side of the body
    pub fn mirror(&self) -> Self {
        Self::new(self.a.mirror(), self.vertex.mirror(), self.c.mirror())
    }

    /// Lowest visibility among the three landmarks
    fn min_visibility(&self, frame: &LandmarkFrame) -> f32 {
        self.landmarks()
            .iter()
            .map(|&i| frame.get(i).visibility)
            .fold(f32::INFINITY, f32::min)
    }
}

/// An angle measured on a specific frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JointAngle {
    /// Vertex landmark of the angle
    pub joint: LandmarkIndex,
    /// Degrees in [0, 180]
    pub degrees: f32,
    pub frame_index: u64,
}

/// Angle at `b` between rays b→a and b→c, in degrees
///
/// cos(θ) = (v1 · v2) / (|v1| × |v2|)
///
/// `None` when either ray has zero length (the angle is undefined).
pub fn angle_degrees(a: &Landmark, b: &Landmark, c: &Landmark) -> Option<f32> {
    let v1 = (a.x - b.x, a.y - b.y);
    let v2 = (c.x - b.x, c.y - b.y);

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let mag1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let mag2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();

    if mag1 < 1e-6 || mag2 < 1e-6 {
        return None;
    }

    let cos_angle = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    Some(cos_angle.acos().to_degrees())
}

/// Confidence-gated angle measurement
#[derive(Debug, Clone, Copy)]
pub struct AngleCalculator {
    min_visibility: f32,
}

impl AngleCalculator {
    pub fn new(min_visibility: f32) -> Self {
        Self { min_visibility }
    }

    pub fn min_visibility(&self) -> f32 {
        self.min_visibility
    }

    /// Angle of `triple` on `frame`, or `InsufficientConfidence` if any of the
    /// three landmarks is below the minimum visibility. Coincident landmarks
    /// give `DegenerateJoint`.
    pub fn angle(&self, frame: &LandmarkFrame, triple: JointTriple) -> Result<f32> {
        for index in triple.landmarks() {
            let lm = frame.get(index);
            if !lm.is_visible(self.min_visibility) {
                return Err(AnalysisError::insufficient_confidence(
                    index,
                    lm.visibility,
                    self.min_visibility,
                ));
            }
        }
        angle_degrees(frame.get(triple.a), frame.get(triple.vertex), frame.get(triple.c))
            .ok_or(AnalysisError::DegenerateJoint { joint: triple.vertex })
    }

    pub fn joint_angle(&self, frame: &LandmarkFrame, triple: JointTriple) -> Result<JointAngle> {
        let degrees = self.angle(frame, triple)?;
        Ok(JointAngle {
            joint: triple.vertex,
            degrees,
            frame_index: frame.index(),
        })
    }

    /// Angle of whichever side is better seen
    ///
    /// Side-on filming hides one limb; the hidden side must not win just
    /// because it comes first.
    pub fn most_visible_angle(&self, frame: &LandmarkFrame, left: JointTriple) -> Result<f32> {
        let right = left.mirror();
        let (primary, secondary) = if left.min_visibility(frame) >= right.min_visibility(frame) {
            (left, right)
        } else {
            (right, left)
        };
        self.angle(frame, primary)
            .or_else(|_| self.angle(frame, secondary))
    }

    /// Mean angle over the triples that pass the visibility check
    ///
    /// Fails with the first error when none pass.
    pub fn mean_angle(&self, frame: &LandmarkFrame, triples: &[JointTriple]) -> Result<f32> {
        let mut sum = 0.0;
        let mut count = 0usize;
        let mut first_err = None;
        for &t in triples {
            match self.angle(frame, t) {
                Ok(a) => {
                    sum += a;
                    count += 1;
                }
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        match (count, first_err) {
            (0, Some(e)) => Err(e),
            (0, None) => Err(AnalysisError::invalid_config("mean_angle needs at least one joint")),
            (n, _) => Ok(sum / n as f32),
        }
    }
}

impl Default for AngleCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_VISIBILITY)
    }
}
