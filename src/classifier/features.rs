//! Window features for exercise classification
//!
//! A single frame cannot tell exercises apart (standing still looks the
//! same for all of them), so every feature is computed over a window.

use crate::pose::{AngleCalculator, JointTriple, LandmarkFrame, LandmarkIndex};

/// Features of one classification window
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WindowFeatures {
    /// Fraction of frames with a usable torso and at least one limb angle
    pub usable_fraction: f32,
    /// Mean torso angle from vertical in degrees (0 = upright, 90 = lying)
    pub torso_tilt_deg: f32,
    /// Max - min of the mean elbow angle over the window
    pub elbow_range_deg: f32,
    /// Max - min of the mean knee angle over the window
    pub knee_range_deg: f32,
    /// Fraction of visible wrists that are above their shoulder
    pub wrists_overhead: f32,
}

impl WindowFeatures {
    pub fn extract(window: &[LandmarkFrame], calculator: &AngleCalculator) -> Self {
        if window.is_empty() {
            return Self::default();
        }
        let threshold = calculator.min_visibility();

        let mut usable = 0usize;
        let mut tilt_sum = 0.0;
        let mut tilt_count = 0usize;
        let mut elbow = Range::default();
        let mut knee = Range::default();
        let mut overhead_sum = 0.0;
        let mut overhead_count = 0usize;

        for frame in window {
            let tilt = torso_tilt(frame, threshold);
            let elbow_angle = calculator
                .mean_angle(frame, &[JointTriple::LEFT_ELBOW, JointTriple::RIGHT_ELBOW])
                .ok();
            let knee_angle = calculator
                .mean_angle(frame, &[JointTriple::LEFT_KNEE, JointTriple::RIGHT_KNEE])
                .ok();

            if usable_parts(tilt, elbow_angle, knee_angle) {
                usable += 1;
            }
            if let Some(t) = tilt {
                tilt_sum += t;
                tilt_count += 1;
            }
            if let Some(a) = elbow_angle {
                elbow.add(a);
            }
            if let Some(a) = knee_angle {
                knee.add(a);
            }
            if let Some(o) = wrists_overhead(frame, threshold) {
                overhead_sum += o;
                overhead_count += 1;
            }
        }

        Self {
            usable_fraction: usable as f32 / window.len() as f32,
            torso_tilt_deg: if tilt_count > 0 { tilt_sum / tilt_count as f32 } else { 0.0 },
            elbow_range_deg: elbow.span(),
            knee_range_deg: knee.span(),
            wrists_overhead: if overhead_count > 0 {
                overhead_sum / overhead_count as f32
            } else {
                0.0
            },
        }
    }
}

/// Whether `frame` would count toward `usable_fraction`
pub fn frame_usable(frame: &LandmarkFrame, calculator: &AngleCalculator) -> bool {
    let tilt = torso_tilt(frame, calculator.min_visibility());
    let elbow = calculator
        .mean_angle(frame, &[JointTriple::LEFT_ELBOW, JointTriple::RIGHT_ELBOW])
        .ok();
    let knee = calculator
        .mean_angle(frame, &[JointTriple::LEFT_KNEE, JointTriple::RIGHT_KNEE])
        .ok();
    usable_parts(tilt, elbow, knee)
}

fn usable_parts(tilt: Option<f32>, elbow: Option<f32>, knee: Option<f32>) -> bool {
    tilt.is_some() && (elbow.is_some() || knee.is_some())
}

#[derive(Debug, Default)]
struct Range {
    min: Option<f32>,
    max: Option<f32>,
}

impl Range {
    fn add(&mut self, v: f32) {
        self.min = Some(self.min.map_or(v, |m| m.min(v)));
        self.max = Some(self.max.map_or(v, |m| m.max(v)));
    }

    fn span(&self) -> f32 {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) => hi - lo,
            _ => 0.0,
        }
    }
}

/// Midpoint of the visible members of a left/right pair
fn visible_mid(frame: &LandmarkFrame, left: LandmarkIndex, threshold: f32) -> Option<(f32, f32)> {
    let points: Vec<(f32, f32)> = [left, left.mirror()]
        .iter()
        .map(|&i| frame.get(i))
        .filter(|l| l.is_visible(threshold))
        .map(|l| (l.x, l.y))
        .collect();
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f32;
    let (sx, sy) = points.iter().fold((0.0, 0.0), |acc, p| (acc.0 + p.0, acc.1 + p.1));
    Some((sx / n, sy / n))
}

/// Angle of the hip→shoulder vector from image vertical, in degrees
fn torso_tilt(frame: &LandmarkFrame, threshold: f32) -> Option<f32> {
    let shoulder = visible_mid(frame, LandmarkIndex::LeftShoulder, threshold)?;
    let hip = visible_mid(frame, LandmarkIndex::LeftHip, threshold)?;
    let dx = shoulder.0 - hip.0;
    let dy = shoulder.1 - hip.1;
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-6 {
        return None;
    }
    // 画像座標は下が正なので「上」は (0, -1)
    Some((-dy / len).clamp(-1.0, 1.0).acos().to_degrees())
}

/// Fraction of visible wrist/shoulder pairs with the wrist higher in the image
fn wrists_overhead(frame: &LandmarkFrame, threshold: f32) -> Option<f32> {
    let mut above = 0usize;
    let mut seen = 0usize;
    for (wrist, shoulder) in [
        (LandmarkIndex::LeftWrist, LandmarkIndex::LeftShoulder),
        (LandmarkIndex::RightWrist, LandmarkIndex::RightShoulder),
    ] {
        let w = frame.get(wrist);
        let s = frame.get(shoulder);
        if w.is_visible(threshold) && s.is_visible(threshold) {
            seen += 1;
            if w.y < s.y {
                above += 1;
            }
        }
    }
    (seen > 0).then(|| above as f32 / seen as f32)
}
