//! Analysis sessions
//!
//! A [`Session`] owns everything one run mutates: the active counter (or the
//! auto-classify state) and the frame statistics. Nothing here is shared
//! between sessions.

pub mod auto;
pub mod runner;

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::classifier::Classification;
use crate::config::AnalysisConfig;
use crate::exercise::{new_counter, ExerciseKind, RepCounter, RepEvent, Stage};
use crate::pose::LandmarkFrame;

pub use auto::{AutoClassifySession, AutoState, AutoStep, Switch};
pub use runner::SessionRunner;

/// 解析モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "exercise", rename_all = "snake_case")]
pub enum Mode {
    /// 利用者が選んだ種目を数える
    Fixed(ExerciseKind),
    /// 種目を推定しながら数える
    AutoClassify,
}

/// ランナーのライフサイクル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

/// 協調的な停止要求。フレーム間でチェックされる
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// 確定した1種目区間の集計
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubTotal {
    pub kind: ExerciseKind,
    pub reps: u32,
    pub started_frame: u64,
    pub ended_frame: u64,
}

/// 1フレーム分の出力
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameResult {
    pub frame_index: u64,
    pub timestamp_ms: u64,
    pub active_kind: Option<ExerciseKind>,
    pub stage: String,
    pub rep_count: u32,
    pub event: RepEvent,
    /// 信頼度不足でカウンタに入らなかったフレーム
    pub skipped: bool,
    /// 自動分類モードで種目未選択のまま、分類にも使えなかったフレーム
    pub unclassifiable: bool,
    /// このフレームで分類が走った場合の結果
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    /// 種目切り替えで確定した前区間
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized: Option<SubTotal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// ソースが終端に達した
    Exhausted,
    /// 停止要求で終わった
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub frames_unclassifiable: u64,
    pub end: EndReason,
    pub segments: Vec<SubTotal>,
}

impl SessionSummary {
    pub fn total_reps(&self) -> u32 {
        self.segments.iter().map(|s| s.reps).sum()
    }
}

/// カウンタに1フレーム渡す。角度が取れなければ (NoChange, true)
pub(crate) fn feed_counter(counter: &mut dyn RepCounter, frame: &LandmarkFrame) -> (RepEvent, bool) {
    match counter.try_update(frame) {
        Ok(event) => (event, false),
        Err(e) => {
            tracing::trace!(frame = frame.index(), "skipped: {}", e);
            (RepEvent::NoChange, true)
        }
    }
}

fn stage_text(kind: Option<ExerciseKind>, stage: Stage) -> String {
    match kind {
        Some(kind) => kind.stage_label(stage).to_string(),
        None => stage.as_str().to_string(),
    }
}

struct FixedSegment {
    counter: Box<dyn RepCounter + Send>,
    first_frame: Option<u64>,
    last_frame: u64,
}

enum Engine {
    Fixed(FixedSegment),
    Auto(AutoClassifySession),
}

/// 1セッション分の状態
pub struct Session {
    engine: Engine,
    frames_processed: u64,
    frames_skipped: u64,
    frames_unclassifiable: u64,
}

impl Session {
    pub fn new(mode: Mode, config: &AnalysisConfig) -> Self {
        let engine = match mode {
            Mode::Fixed(kind) => Engine::Fixed(FixedSegment {
                counter: new_counter(kind, config),
                first_frame: None,
                last_frame: 0,
            }),
            Mode::AutoClassify => Engine::Auto(AutoClassifySession::new(config)),
        };
        Self {
            engine,
            frames_processed: 0,
            frames_skipped: 0,
            frames_unclassifiable: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        match &self.engine {
            Engine::Fixed(seg) => Mode::Fixed(seg.counter.kind()),
            Engine::Auto(_) => Mode::AutoClassify,
        }
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    pub fn frames_unclassifiable(&self) -> u64 {
        self.frames_unclassifiable
    }

    pub fn process(&mut self, frame: &LandmarkFrame) -> FrameResult {
        self.frames_processed += 1;

        let result = match &mut self.engine {
            Engine::Fixed(seg) => {
                seg.first_frame.get_or_insert(frame.index());
                seg.last_frame = frame.index();
                let (event, skipped) = feed_counter(seg.counter.as_mut(), frame);
                let state = seg.counter.state();
                FrameResult {
                    frame_index: frame.index(),
                    timestamp_ms: frame.timestamp_ms(),
                    active_kind: Some(state.kind),
                    stage: stage_text(Some(state.kind), state.stage),
                    rep_count: state.rep_count,
                    event,
                    skipped,
                    unclassifiable: false,
                    classification: None,
                    finalized: None,
                }
            }
            Engine::Auto(auto) => {
                let step = auto.process(frame);
                let (active_kind, stage, rep_count) = match auto.active_counter() {
                    Some(c) => (Some(c.kind()), c.state().stage, c.state().rep_count),
                    None => (None, Stage::Waiting, 0),
                };
                FrameResult {
                    frame_index: frame.index(),
                    timestamp_ms: frame.timestamp_ms(),
                    active_kind,
                    stage: stage_text(active_kind, stage),
                    rep_count,
                    event: step.event,
                    skipped: step.skipped,
                    unclassifiable: step.unclassifiable,
                    classification: step.classification,
                    finalized: step.switch.and_then(|s| s.finalized),
                }
            }
        };

        if result.skipped {
            self.frames_skipped += 1;
        }
        if result.unclassifiable {
            self.frames_unclassifiable += 1;
        }
        result
    }

    /// セッションを閉じて集計を返す
    pub fn finish(self, end: EndReason) -> SessionSummary {
        let segments = match self.engine {
            Engine::Fixed(seg) => match seg.first_frame {
                Some(first) => vec![SubTotal {
                    kind: seg.counter.kind(),
                    reps: seg.counter.state().rep_count,
                    started_frame: first,
                    ended_frame: seg.last_frame,
                }],
                None => Vec::new(),
            },
            Engine::Auto(auto) => auto.finish(),
        };
        SessionSummary {
            frames_processed: self.frames_processed,
            frames_skipped: self.frames_skipped,
            frames_unclassifiable: self.frames_unclassifiable,
            end,
            segments,
        }
    }
}
