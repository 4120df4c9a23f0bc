use serde::Deserialize;

use super::debounce::{PhaseTracker, Transition, Zone};
use super::{ExerciseKind, RepCounter, RepEvent, RepState, Stage};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::pose::{AngleCalculator, JointTriple, LandmarkFrame};

/// 両腕種目のレップ計数ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BilateralPolicy {
    /// どちらかの腕が down→up を完了するたびに1レップ
    /// (交互カールは1回ずつ、両腕同時なら2レップ)
    #[default]
    Either,
    /// 前回のレップ以降に両腕とも down→up を完了したら1レップ
    Both,
}

const LEFT: usize = 0;
const RIGHT: usize = 1;

/// バイセップカール: 左右の肘角度を独立に追跡する
#[derive(Debug, Clone)]
pub struct BicepCurlCounter {
    state: RepState,
    calculator: AngleCalculator,
    policy: BilateralPolicy,
    arms: [PhaseTracker; 2],
    /// Both ポリシー用: 前回レップ以降に完了した腕
    completed: [bool; 2],
}

impl BicepCurlCounter {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let thresholds = config.thresholds.get(ExerciseKind::BicepCurl);
        Self {
            state: RepState::new(ExerciseKind::BicepCurl),
            calculator: AngleCalculator::new(config.visibility_threshold),
            policy: config.bilateral_policy,
            // 肘を曲げきった側が Up
            arms: std::array::from_fn(|_| {
                PhaseTracker::new(thresholds, Zone::Flexed, config.hysteresis_frames)
            }),
            completed: [false; 2],
        }
    }

    pub fn policy(&self) -> BilateralPolicy {
        self.policy
    }

    pub fn left_stage(&self) -> Stage {
        self.arms[LEFT].stage()
    }

    pub fn right_stage(&self) -> Stage {
        self.arms[RIGHT].stage()
    }

    /// 片腕の確定遷移を反映
    fn apply(&mut self, arm: usize, transition: Transition, frame_index: u64) -> RepEvent {
        let counts = transition.completes_rep()
            && match self.policy {
                BilateralPolicy::Either => true,
                BilateralPolicy::Both => {
                    self.completed[arm] = true;
                    if self.completed[LEFT] && self.completed[RIGHT] {
                        self.completed = [false; 2];
                        true
                    } else {
                        false
                    }
                }
            };

        // 合成ステージは直近に遷移した腕に合わせる
        self.state.record(transition.to, counts, frame_index)
    }
}

impl RepCounter for BicepCurlCounter {
    fn kind(&self) -> ExerciseKind {
        ExerciseKind::BicepCurl
    }

    fn state(&self) -> &RepState {
        &self.state
    }

    fn try_update(&mut self, frame: &LandmarkFrame) -> Result<RepEvent> {
        let left = self.calculator.angle(frame, JointTriple::LEFT_ELBOW);
        let right = self.calculator.angle(frame, JointTriple::RIGHT_ELBOW);

        let angles = match (left, right) {
            (Err(e), Err(_)) => return Err(e),
            (l, r) => [l.ok(), r.ok()],
        };

        let mut event = RepEvent::NoChange;
        for arm in [LEFT, RIGHT] {
            let Some(angle) = angles[arm] else { continue };
            if let Some(t) = self.arms[arm].observe(angle) {
                let e = self.apply(arm, t, frame.index());
                // 同一フレームで両腕が動いたらレップ完了を優先。
                // 値は後に処理した腕の累計なので両腕分を含む
                event = match (event, e) {
                    (_, RepEvent::RepCompleted(n)) => RepEvent::RepCompleted(n),
                    (RepEvent::RepCompleted(n), _) => RepEvent::RepCompleted(n),
                    (_, e) => e,
                };
            }
        }
        Ok(event)
    }

    fn reset(&mut self) {
        self.state = RepState::new(ExerciseKind::BicepCurl);
        for arm in &mut self.arms {
            arm.reset();
        }
        self.completed = [false; 2];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::test_support::FrameBuilder;

    const L_SHOULDER: (f32, f32) = (0.4, 0.3);
    const R_SHOULDER: (f32, f32) = (0.6, 0.3);

    fn frame(index: u64, left: f32, right: f32) -> LandmarkFrame {
        FrameBuilder::new()
            .arm(true, L_SHOULDER, left, 0.9)
            .arm(false, R_SHOULDER, right, 0.9)
            .build(index)
    }

    fn counter(policy: BilateralPolicy) -> BicepCurlCounter {
        let mut config = AnalysisConfig::default();
        config.bilateral_policy = policy;
        BicepCurlCounter::from_config(&config)
    }

    /// 各角度を `hold` フレームずつ並べる
    fn script(cycles: usize, hold: usize, curled: f32, extended: f32) -> Vec<f32> {
        let mut angles = vec![extended; hold];
        for _ in 0..cycles {
            angles.extend(std::iter::repeat(curled).take(hold));
            angles.extend(std::iter::repeat(extended).take(hold));
        }
        angles
    }

    #[test]
    fn test_single_arm_k_cycles() {
        for k in [1usize, 3, 7] {
            let mut c = counter(BilateralPolicy::Either);
            for (i, angle) in script(k, 2, 25.0, 170.0).into_iter().enumerate() {
                // 右腕は伸ばしたまま
                c.update(&frame(i as u64, angle, 170.0));
            }
            assert_eq!(c.state().rep_count, k as u32);
        }
    }

    #[test]
    fn test_either_counts_each_arm() {
        let mut c = counter(BilateralPolicy::Either);
        let seq = script(3, 3, 25.0, 170.0);
        for (i, &angle) in seq.iter().enumerate() {
            c.update(&frame(i as u64, angle, angle));
        }
        // 両腕同時カール3回 → 6レップ
        assert_eq!(c.state().rep_count, 6);
    }

    #[test]
    fn test_both_counts_simultaneous_once() {
        let mut c = counter(BilateralPolicy::Both);
        assert_eq!(c.policy(), BilateralPolicy::Both);
        let seq = script(4, 2, 25.0, 170.0);
        for (i, &angle) in seq.iter().enumerate() {
            c.update(&frame(i as u64, angle, angle));
        }
        assert_eq!(c.state().rep_count, 4);
    }

    #[test]
    fn test_both_waits_for_second_arm() {
        let mut c = counter(BilateralPolicy::Both);
        let mut i = 0u64;
        let mut feed = |c: &mut BicepCurlCounter, l: f32, r: f32, n: usize| {
            let mut last = RepEvent::NoChange;
            for _ in 0..n {
                last = c.update(&frame(i, l, r));
                i += 1;
            }
            last
        };
        feed(&mut c, 170.0, 170.0, 2);
        // 左だけカール
        feed(&mut c, 25.0, 170.0, 2);
        feed(&mut c, 170.0, 170.0, 2);
        assert_eq!(c.state().rep_count, 0);
        // 右もカール → 1レップ
        let e = feed(&mut c, 170.0, 25.0, 2);
        assert_eq!(e, RepEvent::RepCompleted(1));
        assert_eq!(c.state().rep_count, 1);
    }

    #[test]
    fn test_event_on_commit_frame() {
        let mut c = counter(BilateralPolicy::Either);
        assert_eq!(c.update(&frame(0, 170.0, 170.0)), RepEvent::NoChange);
        assert_eq!(c.update(&frame(1, 170.0, 170.0)), RepEvent::StageChanged(Stage::Down));
        assert_eq!(c.update(&frame(2, 25.0, 170.0)), RepEvent::NoChange);
        assert_eq!(c.update(&frame(3, 25.0, 170.0)), RepEvent::RepCompleted(1));
        assert_eq!(c.state().stage, Stage::Up);
        assert_eq!(c.left_stage(), Stage::Up);
        assert_eq!(c.right_stage(), Stage::Down);
        assert_eq!(c.state().last_transition_frame, Some(3));
    }

    #[test]
    fn test_simultaneous_commit_reports_total() {
        let mut c = counter(BilateralPolicy::Either);
        c.update(&frame(0, 170.0, 170.0));
        c.update(&frame(1, 170.0, 170.0));
        assert_eq!(c.update(&frame(2, 25.0, 25.0)), RepEvent::NoChange);
        // 両腕が同じフレームで確定 → イベントは累計の2
        assert_eq!(c.update(&frame(3, 25.0, 25.0)), RepEvent::RepCompleted(2));
        assert_eq!(c.state().rep_count, 2);
    }

    #[test]
    fn test_coincident_elbow_and_wrist_is_not_extended() {
        use crate::pose::LandmarkIndex::*;
        let mut c = counter(BilateralPolicy::Either);
        // 左は肘と手首が重なり、右は隠れている
        let collapsed = |i: u64| {
            FrameBuilder::new()
                .set(LeftShoulder, L_SHOULDER, 0.9)
                .set(LeftElbow, (0.4, 0.45), 0.9)
                .set(LeftWrist, (0.4, 0.45), 0.9)
                .arm(false, R_SHOULDER, 170.0, 0.1)
                .build(i)
        };
        for i in 0..2 {
            assert!(c.try_update(&collapsed(i)).is_err());
        }
        assert_eq!(c.left_stage(), Stage::Waiting);

        for i in 2..5 {
            c.update(&frame(i, 25.0, 170.0));
        }
        // Waiting → Up は数えない
        assert_eq!(c.state().rep_count, 0);
    }

    #[test]
    fn test_single_jitter_frame_ignored() {
        let mut c = counter(BilateralPolicy::Either);
        for i in 0..4 {
            c.update(&frame(i, 170.0, 170.0));
        }
        // 1フレームだけ閾値を越えるノイズ
        c.update(&frame(4, 30.0, 170.0));
        for i in 5..10 {
            c.update(&frame(i, 170.0, 170.0));
        }
        assert_eq!(c.state().rep_count, 0);
        assert_eq!(c.state().stage, Stage::Down);
    }

    #[test]
    fn test_hidden_arms_do_not_mutate() {
        let mut c = counter(BilateralPolicy::Either);
        c.update(&frame(0, 170.0, 170.0));
        c.update(&frame(1, 170.0, 170.0));
        c.update(&frame(2, 25.0, 170.0));
        let before = c.state().clone();

        let hidden = FrameBuilder::new()
            .arm(true, L_SHOULDER, 25.0, 0.2)
            .arm(false, R_SHOULDER, 25.0, 0.3)
            .build(3);
        assert!(c.try_update(&hidden).is_err());
        assert_eq!(c.update(&hidden), RepEvent::NoChange);
        assert_eq!(c.state(), &before);

        // 保留中の左腕カールは隠れたフレームをまたいでも続く
        assert_eq!(c.update(&frame(4, 25.0, 170.0)), RepEvent::RepCompleted(1));
    }

    #[test]
    fn test_reset() {
        let mut c = counter(BilateralPolicy::Either);
        for (i, angle) in script(2, 2, 25.0, 170.0).into_iter().enumerate() {
            c.update(&frame(i as u64, angle, 170.0));
        }
        assert_eq!(c.state().rep_count, 2);
        c.reset();
        assert_eq!(c.state(), &RepState::new(ExerciseKind::BicepCurl));
        assert_eq!(c.left_stage(), Stage::Waiting);
    }
}
