//! Session driver
//!
//! Pulls frames from a [`FrameSource`] strictly in order, feeds them to a
//! [`Session`] and reports each [`FrameResult`] to the caller.
//! Lifecycle: `Idle → Running → Stopped`. A runner runs once.

use super::{EndReason, FrameResult, Lifecycle, Mode, Session, SessionSummary, StopHandle};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::source::{FrameSource, SourceError};

/// どの経路で抜けてもソースを1回だけ解放する
struct SourceGuard<'a, S: FrameSource + ?Sized>(&'a mut S);

impl<S: FrameSource + ?Sized> Drop for SourceGuard<'_, S> {
    fn drop(&mut self) {
        self.0.release();
    }
}

pub struct SessionRunner {
    mode: Mode,
    config: AnalysisConfig,
    lifecycle: Lifecycle,
    stop: StopHandle,
}

impl SessionRunner {
    pub fn new(mode: Mode, config: &AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            mode,
            config: config.clone(),
            lifecycle: Lifecycle::Idle,
            stop: StopHandle::new(),
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// 別スレッドやコールバックから停止を要求するためのハンドル
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// ソースが尽きるか停止要求が来るまで回す
    ///
    /// ソース側の失敗はセッションを終わらせ、ソースを解放した上でエラーを返す。
    pub fn run<S, F>(&mut self, source: &mut S, mut on_result: F) -> Result<SessionSummary>
    where
        S: FrameSource + ?Sized,
        F: FnMut(&FrameResult),
    {
        if self.lifecycle != Lifecycle::Idle {
            return Err(AnalysisError::InvalidLifecycle(self.lifecycle));
        }
        self.lifecycle = Lifecycle::Running;
        tracing::info!(mode = ?self.mode, "session started");

        let result = self.drive(source, &mut on_result);
        self.lifecycle = Lifecycle::Stopped;

        match &result {
            Ok(summary) => tracing::info!(
                frames = summary.frames_processed,
                skipped = summary.frames_skipped,
                unclassifiable = summary.frames_unclassifiable,
                reps = summary.total_reps(),
                end = ?summary.end,
                "session finished"
            ),
            Err(e) => tracing::warn!("session aborted: {}", e),
        }
        result
    }

    /// 全結果を集めて返す
    pub fn run_to_vec<S>(&mut self, source: &mut S) -> Result<(Vec<FrameResult>, SessionSummary)>
    where
        S: FrameSource + ?Sized,
    {
        let mut results = Vec::new();
        let summary = self.run(source, |r| results.push(r.clone()))?;
        Ok((results, summary))
    }

    fn drive<S, F>(&self, source: &mut S, on_result: &mut F) -> Result<SessionSummary>
    where
        S: FrameSource + ?Sized,
        F: FnMut(&FrameResult),
    {
        let guard = SourceGuard(source);
        // 固定 sleep ではなくソースの準備完了を待つ
        guard.0.wait_ready()?;

        let mut session = Session::new(self.mode, &self.config);
        let mut previous: Option<u64> = None;

        let end = loop {
            if self.stop.is_stopped() {
                tracing::info!(frames = session.frames_processed(), "stop requested");
                break EndReason::Stopped;
            }
            let frame = match guard.0.next_frame()? {
                Some(frame) => frame,
                None => break EndReason::Exhausted,
            };
            if let Some(prev) = previous {
                if frame.index() <= prev {
                    return Err(SourceError::OutOfOrder {
                        previous: prev,
                        got: frame.index(),
                    }
                    .into());
                }
            }
            previous = Some(frame.index());

            let result = session.process(&frame);
            on_result(&result);
        };

        drop(guard);
        Ok(session.finish(end))
    }
}
