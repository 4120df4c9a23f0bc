pub mod classifier;
pub mod config;
pub mod error;
pub mod exercise;
pub mod pose;
pub mod session;
pub mod source;

pub use error::{AnalysisError, Result};
