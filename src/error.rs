//! Error types for the analysis pipeline.

use thiserror::Error;

use crate::pose::LandmarkIndex;
use crate::session::Lifecycle;
use crate::source::SourceError;

/// Errors raised by the analysis core.
///
/// `InsufficientConfidence` and `DegenerateJoint` are per-frame and recovered
/// locally by skipping the frame. `FrameSourceFailure` ends the session.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A landmark needed for the measurement is below the visibility threshold.
    #[error("insufficient confidence: {joint} visibility {visibility:.2} < {threshold:.2}")]
    InsufficientConfidence {
        /// The first landmark that failed the check.
        joint: LandmarkIndex,
        /// Its visibility.
        visibility: f32,
        /// The configured minimum.
        threshold: f32,
    },

    /// Two landmarks of a joint coincide, so its angle is undefined.
    #[error("degenerate joint: {joint} has a zero-length limb")]
    DegenerateJoint {
        /// Vertex of the joint.
        joint: LandmarkIndex,
    },

    /// The frame source could not deliver a frame.
    #[error("frame source failure: {0}")]
    FrameSourceFailure(#[from] SourceError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The runner was asked to start from a lifecycle state other than `Idle`.
    #[error("session cannot start from {0:?}")]
    InvalidLifecycle(Lifecycle),
}

impl AnalysisError {
    #[must_use]
    pub fn insufficient_confidence(joint: LandmarkIndex, visibility: f32, threshold: f32) -> Self {
        Self::InsufficientConfidence {
            joint,
            visibility,
            threshold,
        }
    }

    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Transient errors are skipped frame-by-frame instead of ending the session.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::InsufficientConfidence { .. } | Self::DegenerateJoint { .. })
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
