//! Frame sources
//!
//! A source yields landmark frames in order until end of stream. The runner
//! calls `wait_ready` once before the first pull and `release` exactly once
//! when the session ends, whatever the reason.

pub mod jsonl;
pub mod memory;
pub mod threaded;

use thiserror::Error;

use crate::pose::LandmarkFrame;

pub use jsonl::JsonlSource;
pub use memory::MemorySource;
pub use threaded::ThreadedSource;

/// フレーム取得の失敗
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: invalid JSON: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("frame index went from {previous} to {got}")]
    OutOfOrder { previous: u64, got: u64 },

    #[error("device error: {0}")]
    Device(String),

    #[error("acquisition thread disconnected")]
    Disconnected,
}

/// ランドマークフレームの供給元
pub trait FrameSource {
    /// 最初のフレームを取れる状態になるまでブロックする
    fn wait_ready(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    /// 次のフレーム。`Ok(None)` でストリーム終端
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError>;

    /// 取得を止めてリソースを解放する
    fn release(&mut self) {}
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn wait_ready(&mut self) -> Result<(), SourceError> {
        (**self).wait_ready()
    }

    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError> {
        (**self).next_frame()
    }

    fn release(&mut self) {
        (**self).release()
    }
}
