//! Auto-classify mode
//!
//! Classifies a sliding window every `classifier_stride_frames` frames and
//! switches the active counter once `switch_debounce_windows` consecutive
//! windows agree on a different exercise.

use serde::Serialize;

use super::{feed_counter, SubTotal};
use crate::classifier::{Classification, ExerciseClassifier, FrameWindow};
use crate::config::AnalysisConfig;
use crate::exercise::{new_counter, Debouncer, ExerciseKind, RepCounter, RepEvent};
use crate::pose::LandmarkFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "exercise", rename_all = "snake_case")]
pub enum AutoState {
    NoExerciseSelected,
    ExerciseActive(ExerciseKind),
}

impl AutoState {
    pub fn kind(self) -> Option<ExerciseKind> {
        match self {
            AutoState::NoExerciseSelected => None,
            AutoState::ExerciseActive(kind) => Some(kind),
        }
    }
}

/// 種目切り替え
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Switch {
    pub from: Option<ExerciseKind>,
    pub to: ExerciseKind,
    /// 切り替え前の区間 (初回選択では None)
    pub finalized: Option<SubTotal>,
}

/// `AutoClassifySession::process` の結果
#[derive(Debug, Clone, PartialEq)]
pub struct AutoStep {
    pub classification: Option<Classification>,
    pub switch: Option<Switch>,
    pub event: RepEvent,
    pub skipped: bool,
    /// 種目未選択で、分類にも使えないフレーム
    pub unclassifiable: bool,
}

struct ActiveSegment {
    counter: Box<dyn RepCounter + Send>,
    started_frame: u64,
    last_frame: u64,
}

impl ActiveSegment {
    fn subtotal(&self) -> SubTotal {
        SubTotal {
            kind: self.counter.kind(),
            reps: self.counter.state().rep_count,
            started_frame: self.started_frame,
            ended_frame: self.last_frame,
        }
    }
}

pub struct AutoClassifySession {
    config: AnalysisConfig,
    classifier: ExerciseClassifier,
    window: FrameWindow,
    stride: usize,
    since_classified: usize,
    switch: Debouncer<ExerciseKind>,
    active: Option<ActiveSegment>,
    segments: Vec<SubTotal>,
    last_classification: Option<Classification>,
}

impl AutoClassifySession {
    pub fn new(config: &AnalysisConfig) -> Self {
        let stride = config.classifier_stride_frames.max(1);
        Self {
            config: config.clone(),
            classifier: ExerciseClassifier::from_config(config),
            window: FrameWindow::new(config.classifier_window_frames),
            stride,
            // 窓が埋まった最初のフレームで分類する
            since_classified: stride,
            switch: Debouncer::new(config.switch_debounce_windows),
            active: None,
            segments: Vec::new(),
            last_classification: None,
        }
    }

    pub fn state(&self) -> AutoState {
        match &self.active {
            Some(seg) => AutoState::ExerciseActive(seg.counter.kind()),
            None => AutoState::NoExerciseSelected,
        }
    }

    pub fn active_counter(&self) -> Option<&dyn RepCounter> {
        self.active.as_ref().map(|seg| seg.counter.as_ref() as &dyn RepCounter)
    }

    /// 確定済みの区間 (現在の区間は含まない)
    pub fn segments(&self) -> &[SubTotal] {
        &self.segments
    }

    pub fn last_classification(&self) -> Option<Classification> {
        self.last_classification
    }

    /// 切り替え候補とその連続回数
    pub fn pending_switch(&self) -> Option<(ExerciseKind, usize)> {
        self.switch.pending()
    }

    /// 分類結果を1窓分反映する
    ///
    /// `Unknown` は候補の連続をリセットするだけで、現在の種目は変えない。
    pub fn observe_classification(
        &mut self,
        classification: Classification,
        frame_index: u64,
    ) -> Option<Switch> {
        self.last_classification = Some(classification);
        let current = self.state().kind();
        let kind = self.switch.observe(current, classification.kind())?;

        let finalized = self.active.take().map(|seg| seg.subtotal());
        if let Some(done) = &finalized {
            self.segments.push(done.clone());
        }
        tracing::info!(
            frame = frame_index,
            from = ?current,
            to = %kind,
            finalized_reps = finalized.as_ref().map(|s| s.reps),
            "exercise switched"
        );

        self.active = Some(ActiveSegment {
            counter: new_counter(kind, &self.config),
            started_frame: frame_index,
            last_frame: frame_index,
        });
        Some(Switch {
            from: current,
            to: kind,
            finalized,
        })
    }

    /// 1フレーム進める: 窓に積む → (周期が来れば) 分類 → 有効なカウンタへ
    pub fn process(&mut self, frame: &LandmarkFrame) -> AutoStep {
        self.window.push(frame.clone());
        self.since_classified = self.since_classified.saturating_add(1);

        let mut classification = None;
        let mut switch = None;
        if self.window.is_full() && self.since_classified >= self.stride {
            self.since_classified = 0;
            let c = self.classifier.evaluate(self.window.frames());
            tracing::debug!(frame = frame.index(), classification = ?c, "window classified");
            classification = Some(c);
            switch = self.observe_classification(c, frame.index());
        }

        let (event, skipped, unclassifiable) = match self.active.as_mut() {
            Some(seg) => {
                seg.last_frame = frame.index();
                let (event, skipped) = feed_counter(seg.counter.as_mut(), frame);
                (event, skipped, false)
            }
            None => (RepEvent::NoChange, false, !self.classifier.is_usable(frame)),
        };

        AutoStep {
            classification,
            switch,
            event,
            skipped,
            unclassifiable,
        }
    }

    /// 現在の区間も確定させて全区間を返す
    pub fn finish(mut self) -> Vec<SubTotal> {
        if let Some(seg) = self.active.take() {
            self.segments.push(seg.subtotal());
        }
        self.segments
    }
}
