use crate::browser::ViewportSize;
use crate::errors::TimelapseError;
use crate::timing::{serialize_secs, ticks_for_duration};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How many ticks a session runs, as requested by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickCount {
    Shots(u32),
    Duration(#[serde(serialize_with = "serialize_secs")] Duration),
}

impl TickCount {
    pub fn resolve(&self, interval: Duration) -> Result<u32, TimelapseError> {
        match *self {
            TickCount::Shots(n) => Ok(n),
            TickCount::Duration(total) => ticks_for_duration(total, interval),
        }
    }
}

/// Immutable description of one capture run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    url: String,
    output_dir: PathBuf,
    #[serde(serialize_with = "serialize_secs")]
    interval: Duration,
    ticks: u32,
    viewport: ViewportSize,
    full_page: bool,
    #[serde(serialize_with = "serialize_secs")]
    settle: Duration,
}

impl Session {
    pub fn builder(url: impl Into<String>, output_dir: impl Into<PathBuf>) -> SessionBuilder {
        SessionBuilder::new(url, output_dir)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Total number of ticks, always at least one.
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn viewport(&self) -> ViewportSize {
        self.viewport
    }

    pub fn full_page(&self) -> bool {
        self.full_page
    }

    /// Wait after navigation before the snapshot.
    pub fn settle(&self) -> Duration {
        self.settle
    }
}

#[derive(Debug, Clone)]
pub struct SessionBuilder {
    url: String,
    output_dir: PathBuf,
    interval: Duration,
    tick_count: TickCount,
    viewport: ViewportSize,
    full_page: bool,
    settle: Duration,
}

impl SessionBuilder {
    pub fn new(url: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            output_dir: output_dir.into(),
            interval: Duration::from_secs(300),
            tick_count: TickCount::Shots(1),
            viewport: ViewportSize::new(1280, 800),
            full_page: false,
            settle: Duration::from_secs(3),
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn shots(mut self, shots: u32) -> Self {
        self.tick_count = TickCount::Shots(shots);
        self
    }

    pub fn duration(mut self, total: Duration) -> Self {
        self.tick_count = TickCount::Duration(total);
        self
    }

    pub fn tick_count(mut self, tick_count: TickCount) -> Self {
        self.tick_count = tick_count;
        self
    }

    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = ViewportSize::new(width, height);
        self
    }

    pub fn full_page(mut self, full_page: bool) -> Self {
        self.full_page = full_page;
        self
    }

    pub fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn build(self) -> Result<Session, TimelapseError> {
        if self.url.trim().is_empty() {
            return Err(TimelapseError::invalid_config("url must not be empty"));
        }
        if self.interval.is_zero() {
            return Err(TimelapseError::invalid_config(
                "interval must be greater than zero",
            ));
        }
        if self.tick_count == TickCount::Shots(0) {
            return Err(TimelapseError::invalid_config("shots must be at least 1"));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(TimelapseError::invalid_config(format!(
                "invalid viewport {}",
                self.viewport
            )));
        }

        let ticks = self.tick_count.resolve(self.interval)?;
        Ok(Session {
            url: self.url,
            output_dir: self.output_dir,
            interval: self.interval,
            ticks,
            viewport: self.viewport,
            full_page: self.full_page,
            settle: self.settle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let session = Session::builder("https://example.com", "captures")
            .build()
            .unwrap();
        assert_eq!(session.interval(), Duration::from_secs(300));
        assert_eq!(session.ticks(), 1);
        assert_eq!(session.viewport(), ViewportSize::new(1280, 800));
        assert!(!session.full_page());
        assert_eq!(session.settle(), Duration::from_secs(3));
    }

    #[test]
    fn duration_is_resolved_at_build_time() {
        let session = Session::builder("https://example.com", "captures")
            .interval(Duration::from_secs(30))
            .duration(Duration::from_secs(100))
            .build()
            .unwrap();
        assert_eq!(session.ticks(), 3);
    }

    #[test]
    fn rejects_zero_interval_and_shots() {
        let zero_interval = Session::builder("https://example.com", "out")
            .interval(Duration::ZERO)
            .build();
        assert!(matches!(zero_interval, Err(TimelapseError::InvalidConfig(_))));

        let zero_shots = Session::builder("https://example.com", "out").shots(0).build();
        assert!(matches!(zero_shots, Err(TimelapseError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_duration_with_too_many_ticks() {
        let result = Session::builder("https://example.com", "out")
            .interval(Duration::from_millis(1))
            .duration(Duration::from_secs(50 * 24 * 3600))
            .build();
        assert!(matches!(result, Err(TimelapseError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_empty_url_and_viewport() {
        assert!(Session::builder("  ", "out").build().is_err());
        assert!(Session::builder("https://example.com", "out")
            .viewport(0, 600)
            .build()
            .is_err());
    }

    #[test]
    fn serializes_durations_as_seconds() {
        let session = Session::builder("https://example.com", "out")
            .interval(Duration::from_millis(1500))
            .build()
            .unwrap();
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["interval"], 1.5);
        assert_eq!(json["viewport"]["width"], 1280);
    }
}
