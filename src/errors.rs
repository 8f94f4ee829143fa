use crate::browser::BrowserError;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error for a timelapse run.
///
/// Per-tick capture failures never show up here: they are recorded on the
/// frame they belong to. Only conditions that stop the run (or prevent it
/// from starting) are surfaced as a `TimelapseError`.
#[derive(Debug, Error)]
pub enum TimelapseError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to acquire browser session: {0}")]
    SessionAcquisition(#[source] BrowserError),
    #[error("Scheduler has already run")]
    AlreadyRun,
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Background task failed: {0}")]
    Task(String),
}

impl TimelapseError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        TimelapseError::InvalidConfig(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TimelapseError::Io {
            path: path.into(),
            source,
        }
    }
}
