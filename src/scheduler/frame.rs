use crate::timing::serialize_secs;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const FRAME_PREFIX: &str = "screenshot_";
pub const FRAME_EXTENSION: &str = "png";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum CaptureOutcome {
    Success,
    /// The tick keeps its slot; nothing is guaranteed to exist at the path.
    Failed(String),
}

impl CaptureOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CaptureOutcome::Success)
    }
}

/// Which snapshot path a successful capture took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    Viewport,
    FullPage,
    /// Full page was requested but failed; a viewport snapshot was saved.
    ViewportFallback,
}

/// Record of one tick.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    /// 0-based, dense, never reused within a session
    pub sequence: u32,
    pub captured_at: DateTime<Local>,
    pub path: PathBuf,
    pub outcome: CaptureOutcome,
    pub mode: Option<CaptureMode>,
    /// Pixel size of the saved image, when it could be read back
    pub dimensions: Option<(u32, u32)>,
    /// Tick start relative to session start
    #[serde(serialize_with = "serialize_secs")]
    pub offset: Duration,
    #[serde(serialize_with = "serialize_secs")]
    pub capture_time: Duration,
}

impl Frame {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// `screenshot_{sequence:06}_{YYYYMMDD-HHMMSS}.png`
///
/// The timestamp is for humans only; it is second-resolution and may collide.
pub fn frame_file_name(sequence: u32, captured_at: &DateTime<Local>) -> String {
    format!(
        "{FRAME_PREFIX}{sequence:06}_{}.{FRAME_EXTENSION}",
        captured_at.format("%Y%m%d-%H%M%S")
    )
}

pub fn is_frame_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with(FRAME_PREFIX)
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(FRAME_EXTENSION))
}
