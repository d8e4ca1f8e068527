use std::path::PathBuf;

use thiserror::Error;

use crate::shared::config::ConfigError;

/// Failures that end a processing, optimization or clipping run.
///
/// None of these are retried; the caller fixes its inputs and re-runs.
/// End of stream is not represented here: it terminates a pass normally.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("model file not found at {}", .0.display())]
    MissingModel(PathBuf),
    #[error("video file not found at {}", .0.display())]
    MissingVideo(PathBuf),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("detector failed: {0}")]
    Detector(String),
    #[error("video I/O failed: {0}")]
    Video(String),
    #[error("cancelled")]
    Cancelled,
}

impl MonitorError {
    /// Process exit code reported by the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            MonitorError::MissingModel(_) => 2,
            MonitorError::MissingVideo(_) => 3,
            MonitorError::InvalidConfig(_) | MonitorError::Config(_) => 4,
            MonitorError::Detector(_) => 5,
            MonitorError::Video(_) => 6,
            MonitorError::Cancelled => 130,
        }
    }

    pub fn detector(err: impl std::fmt::Display) -> Self {
        MonitorError::Detector(err.to_string())
    }

    pub fn video(err: impl std::fmt::Display) -> Self {
        MonitorError::Video(err.to_string())
    }

    /// Recovers a `MonitorError` carried in a boxed error; anything else is
    /// wrapped with `wrap`.
    pub fn from_boxed(err: Box<dyn std::error::Error>, wrap: fn(String) -> MonitorError) -> Self {
        match err.downcast::<MonitorError>() {
            Ok(e) => *e,
            Err(other) => wrap(other.to_string()),
        }
    }
}
