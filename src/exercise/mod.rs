//! Per-exercise repetition counters
//!
//! Every exercise is one [`RepCounter`] implementation. The pipeline never
//! branches on the exercise kind itself; it asks [`new_counter`] for the
//! matching variant.

pub mod curl;
pub mod debounce;
pub mod push_up;
pub mod shoulder_press;
pub mod squat;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::pose::LandmarkFrame;

pub use curl::{BicepCurlCounter, BilateralPolicy};
pub use debounce::{Debouncer, PhaseTracker, Transition, Zone};
pub use push_up::PushUpCounter;
pub use shoulder_press::ShoulderPressCounter;
pub use squat::SquatCounter;

/// 対応種目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    BicepCurl,
    PushUp,
    Squat,
    ShoulderPress,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 4] = [
        ExerciseKind::BicepCurl,
        ExerciseKind::PushUp,
        ExerciseKind::Squat,
        ExerciseKind::ShoulderPress,
    ];

    /// 表示名
    pub fn display_name(self) -> &'static str {
        match self {
            ExerciseKind::BicepCurl => "Bicep Curl",
            ExerciseKind::PushUp => "Push Up",
            ExerciseKind::Squat => "Squat",
            ExerciseKind::ShoulderPress => "Shoulder Press",
        }
    }

    /// 設定ファイル・CLI で使う名前
    pub fn key(self) -> &'static str {
        match self {
            ExerciseKind::BicepCurl => "bicep_curl",
            ExerciseKind::PushUp => "push_up",
            ExerciseKind::Squat => "squat",
            ExerciseKind::ShoulderPress => "shoulder_press",
        }
    }

    /// ステージの種目別表示
    pub fn stage_label(self, stage: Stage) -> &'static str {
        match (self, stage) {
            (_, Stage::Waiting) => "waiting",
            (ExerciseKind::BicepCurl, Stage::Down) => "extended",
            (ExerciseKind::BicepCurl, Stage::Up) => "curled",
            (ExerciseKind::PushUp, Stage::Down) => "chest down",
            (ExerciseKind::PushUp, Stage::Up) => "arms locked",
            (ExerciseKind::Squat, Stage::Down) => "bottom",
            (ExerciseKind::Squat, Stage::Up) => "standing",
            (ExerciseKind::ShoulderPress, Stage::Down) => "racked",
            (ExerciseKind::ShoulderPress, Stage::Up) => "overhead",
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ExerciseKind {
    type Err = String;

    /// `bicep_curl`, `bicep-curl`, `Bicep Curl` のどれでも受け付ける
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "bicepcurl" | "biceptcurl" | "curl" => Ok(ExerciseKind::BicepCurl),
            "pushup" => Ok(ExerciseKind::PushUp),
            "squat" => Ok(ExerciseKind::Squat),
            "shoulderpress" | "press" => Ok(ExerciseKind::ShoulderPress),
            _ => Err(format!("unknown exercise: {s}")),
        }
    }
}

/// 動作サイクルの段階
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// まだどちらの閾値も確定していない
    Waiting,
    Down,
    Up,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Waiting => "waiting",
            Stage::Down => "down",
            Stage::Up => "up",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `update` の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RepEvent {
    NoChange,
    StageChanged(Stage),
    /// 更新後の累計レップ数。前フレームからの増分ではない
    /// (`BilateralPolicy::Either` で両腕が同じフレームで確定すると2増える)
    RepCompleted(u32),
}

/// 種目ごとのカウンタ状態。`RepCounter::update` だけが変更する
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepState {
    pub kind: ExerciseKind,
    pub stage: Stage,
    pub rep_count: u32,
    pub last_transition_frame: Option<u64>,
}

impl RepState {
    pub fn new(kind: ExerciseKind) -> Self {
        Self {
            kind,
            stage: Stage::Waiting,
            rep_count: 0,
            last_transition_frame: None,
        }
    }

    /// 確定したステージ遷移を反映してイベントを返す
    fn commit(&mut self, transition: Transition, frame_index: u64) -> RepEvent {
        self.record(transition.to, transition.completes_rep(), frame_index)
    }

    fn record(&mut self, stage: Stage, counts: bool, frame_index: u64) -> RepEvent {
        self.stage = stage;
        self.last_transition_frame = Some(frame_index);
        if counts {
            self.rep_count += 1;
            tracing::info!(
                frame = frame_index,
                exercise = %self.kind,
                reps = self.rep_count,
                "rep completed"
            );
            RepEvent::RepCompleted(self.rep_count)
        } else {
            tracing::debug!(
                frame = frame_index,
                exercise = %self.kind,
                stage = self.kind.stage_label(stage),
                "stage changed"
            );
            RepEvent::StageChanged(stage)
        }
    }
}

/// 1種目分のレップカウンタ
pub trait RepCounter {
    fn kind(&self) -> ExerciseKind;

    fn state(&self) -> &RepState;

    /// 1フレーム進める。角度が取れないフレームは `InsufficientConfidence`
    /// を返し、状態は一切変えない。
    fn try_update(&mut self, frame: &LandmarkFrame) -> Result<RepEvent>;

    /// 新しい RepState に戻す
    fn reset(&mut self);

    /// 信頼度不足のフレームは `NoChange` として読み飛ばす
    fn update(&mut self, frame: &LandmarkFrame) -> RepEvent {
        match self.try_update(frame) {
            Ok(event) => event,
            Err(e) => {
                tracing::trace!(frame = frame.index(), "skipped: {}", e);
                RepEvent::NoChange
            }
        }
    }
}

/// 種目に対応するカウンタを作る
pub fn new_counter(kind: ExerciseKind, config: &AnalysisConfig) -> Box<dyn RepCounter + Send> {
    match kind {
        ExerciseKind::BicepCurl => Box::new(BicepCurlCounter::from_config(config)),
        ExerciseKind::PushUp => Box::new(PushUpCounter::from_config(config)),
        ExerciseKind::Squat => Box::new(SquatCounter::from_config(config)),
        ExerciseKind::ShoulderPress => Box::new(ShoulderPressCounter::from_config(config)),
    }
}

/// 角度1本で数える種目の共通部分
#[derive(Debug, Clone)]
pub(crate) struct SingleAngleCore {
    state: RepState,
    phase: PhaseTracker,
}

impl SingleAngleCore {
    pub(crate) fn new(kind: ExerciseKind, config: &AnalysisConfig, up_zone: Zone) -> Self {
        Self {
            state: RepState::new(kind),
            phase: PhaseTracker::new(config.thresholds.get(kind), up_zone, config.hysteresis_frames),
        }
    }

    pub(crate) fn state(&self) -> &RepState {
        &self.state
    }

    pub(crate) fn advance(&mut self, angle: f32, frame_index: u64) -> RepEvent {
        match self.phase.observe(angle) {
            Some(t) => self.state.commit(t, frame_index),
            None => RepEvent::NoChange,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.state = RepState::new(self.state.kind);
        self.phase.reset();
    }
}
