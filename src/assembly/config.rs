//! Video job description

use crate::errors::TimelapseError;
use crate::scheduler::Session;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_FPS: u32 = 12;
pub const DEFAULT_VIDEO_NAME: &str = "timelapse.mp4";

/// One assembly request, consumed once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoJob {
    /// Directory holding the frames; the video is written here too
    source_dir: PathBuf,
    /// Frames per second
    fps: u32,
    /// Output file name inside `source_dir`
    output_name: String,
    /// Encoded width; height follows the aspect ratio
    width: u32,
}

impl VideoJob {
    pub fn new(
        source_dir: impl Into<PathBuf>,
        fps: u32,
        output_name: impl Into<String>,
        width: u32,
    ) -> Result<Self, TimelapseError> {
        let output_name = output_name.into();
        if fps == 0 {
            return Err(TimelapseError::invalid_config("fps must be greater than zero"));
        }
        if width == 0 {
            return Err(TimelapseError::invalid_config(
                "video width must be greater than zero",
            ));
        }
        let is_plain_name = Path::new(&output_name)
            .file_name()
            .is_some_and(|n| n == output_name.as_str());
        if !is_plain_name {
            return Err(TimelapseError::invalid_config(format!(
                "video name must be a plain file name, got {output_name:?}"
            )));
        }

        Ok(Self {
            source_dir: source_dir.into(),
            fps,
            output_name,
            width,
        })
    }

    /// Job for a finished session, encoded at the viewport width.
    pub fn from_session(
        session: &Session,
        fps: u32,
        output_name: impl Into<String>,
    ) -> Result<Self, TimelapseError> {
        Self::new(
            session.output_dir(),
            fps,
            output_name,
            session.viewport().width,
        )
    }

    pub fn with_width(mut self, width: u32) -> Result<Self, TimelapseError> {
        if width == 0 {
            return Err(TimelapseError::invalid_config(
                "video width must be greater than zero",
            ));
        }
        self.width = width;
        Ok(self)
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn output_path(&self) -> PathBuf {
        self.source_dir.join(&self.output_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn from_session_uses_viewport_width() {
        let session = Session::builder("https://example.com", "/tmp/frames")
            .viewport(1440, 900)
            .interval(Duration::from_secs(5))
            .build()
            .unwrap();
        let job = VideoJob::from_session(&session, DEFAULT_FPS, DEFAULT_VIDEO_NAME).unwrap();
        assert_eq!(job.width(), 1440);
        assert_eq!(job.fps(), 12);
        assert_eq!(job.output_path(), PathBuf::from("/tmp/frames/timelapse.mp4"));
    }

    #[test]
    fn rejects_invalid_jobs() {
        assert!(VideoJob::new("out", 0, "a.mp4", 1280).is_err());
        assert!(VideoJob::new("out", 12, "a.mp4", 0).is_err());
        assert!(VideoJob::new("out", 12, "", 1280).is_err());
        assert!(VideoJob::new("out", 12, "../a.mp4", 1280).is_err());
        assert!(VideoJob::new("out", 12, "sub/a.mp4", 1280).is_err());
    }

    #[test]
    fn width_override() {
        let job = VideoJob::new("out", 24, "a.mp4", 1280)
            .unwrap()
            .with_width(1920)
            .unwrap();
        assert_eq!(job.width(), 1920);
        assert!(job.clone().with_width(0).is_err());
    }
}
