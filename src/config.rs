//! Configuration management for webtimelapse
//!
//! A TOML file with `[capture]`, `[video]` and `[browser]` sections. Every
//! key is optional; command line flags override whatever the file sets.

use crate::assembly::VideoJob;
use crate::browser::{BrowserOptions, ViewportSize};
use crate::errors::TimelapseError;
use crate::run::RunPlan;
use crate::scheduler::{Session, TickCount};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelapseConfig {
    pub capture: CaptureConfig,
    pub video: VideoConfig,
    pub browser: BrowserConfig,
}

/// What to capture and how often
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Page to capture
    pub url: String,
    /// Frame store directory
    pub output_dir: PathBuf,
    /// Seconds between tick starts
    pub interval_secs: f64,
    /// Fixed number of captures; exclusive with `duration_secs`
    pub shots: Option<u32>,
    /// Total run time in seconds; exclusive with `shots`
    pub duration_secs: Option<f64>,
    pub width: u32,
    pub height: u32,
    /// Capture the whole document instead of the viewport
    pub full_page: bool,
    /// Seconds to wait after navigation before capturing
    pub load_wait_secs: f64,
}

/// Video assembly settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub enabled: bool,
    pub fps: u32,
    /// Output file name, written inside the frame store
    pub file_name: String,
    /// Encoded width; the viewport width when unset
    pub width: Option<u32>,
    /// Encoder program name or path
    pub ffmpeg: PathBuf,
}

/// Browser session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Existing WebDriver server; a local chromedriver is spawned when unset
    pub webdriver_url: Option<String>,
    /// chromedriver binary; looked up on PATH when unset
    pub chromedriver: Option<PathBuf>,
    pub page_load_timeout_secs: u64,
    /// How long to wait for a spawned chromedriver to report ready
    pub startup_timeout_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            output_dir: PathBuf::from("./captures"),
            interval_secs: 300.0,
            shots: None,
            duration_secs: None,
            width: 1280,
            height: 800,
            full_page: false,
            load_wait_secs: 3.0,
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fps: crate::assembly::DEFAULT_FPS,
            file_name: crate::assembly::DEFAULT_VIDEO_NAME.to_string(),
            width: None,
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: None,
            chromedriver: None,
            page_load_timeout_secs: BrowserOptions::DEFAULT_PAGE_LOAD_TIMEOUT.as_secs(),
            startup_timeout_secs: 20,
        }
    }
}

fn seconds(name: &str, value: f64) -> Result<Duration, TimelapseError> {
    Duration::try_from_secs_f64(value).map_err(|_| {
        TimelapseError::invalid_config(format!("{name} must be a non-negative number of seconds, got {value}"))
    })
}

impl TimelapseConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, TimelapseError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| TimelapseError::io(path, e))?;
        let config: TimelapseConfig = toml::from_str(&contents).map_err(|e| {
            TimelapseError::invalid_config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), TimelapseError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| TimelapseError::io(parent, e))?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(|e| {
            TimelapseError::invalid_config(format!("Failed to serialize config: {}", e))
        })?;
        fs::write(path, toml_string).map_err(|e| TimelapseError::io(path, e))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("webtimelapse.toml")
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), TimelapseError> {
        let capture = &self.capture;
        if capture.url.trim().is_empty() {
            return Err(TimelapseError::invalid_config("a URL is required"));
        }
        if seconds("interval", capture.interval_secs)?.is_zero() {
            return Err(TimelapseError::invalid_config("interval must be greater than zero"));
        }
        match (capture.shots, capture.duration_secs) {
            (Some(_), Some(_)) => {
                return Err(TimelapseError::invalid_config(
                    "shots and duration are mutually exclusive",
                ))
            }
            (None, None) => {
                return Err(TimelapseError::invalid_config(
                    "one of shots or duration is required",
                ))
            }
            (Some(0), None) => {
                return Err(TimelapseError::invalid_config("shots must be at least 1"))
            }
            (None, Some(duration)) => {
                seconds("duration", duration)?;
            }
            (Some(_), None) => {}
        }
        if capture.width == 0 || capture.height == 0 {
            return Err(TimelapseError::invalid_config("viewport size must be non-zero"));
        }
        seconds("load wait", capture.load_wait_secs)?;

        if self.video.fps == 0 || self.video.fps > 240 {
            return Err(TimelapseError::invalid_config("fps must be between 1 and 240"));
        }
        if self.video.width == Some(0) {
            return Err(TimelapseError::invalid_config("video width must be non-zero"));
        }
        if self.browser.page_load_timeout_secs == 0 {
            return Err(TimelapseError::invalid_config(
                "page load timeout must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn tick_count(&self) -> Result<TickCount, TimelapseError> {
        match (self.capture.shots, self.capture.duration_secs) {
            (Some(shots), None) => Ok(TickCount::Shots(shots)),
            (None, Some(duration)) => Ok(TickCount::Duration(seconds("duration", duration)?)),
            (Some(_), Some(_)) => Err(TimelapseError::invalid_config(
                "shots and duration are mutually exclusive",
            )),
            (None, None) => Err(TimelapseError::invalid_config(
                "one of shots or duration is required",
            )),
        }
    }

    pub fn session(&self) -> Result<Session, TimelapseError> {
        let capture = &self.capture;
        Session::builder(capture.url.clone(), capture.output_dir.clone())
            .interval(seconds("interval", capture.interval_secs)?)
            .tick_count(self.tick_count()?)
            .viewport(capture.width, capture.height)
            .full_page(capture.full_page)
            .settle(seconds("load wait", capture.load_wait_secs)?)
            .build()
    }

    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions::new(ViewportSize::new(self.capture.width, self.capture.height))
            .with_page_load_timeout(Duration::from_secs(self.browser.page_load_timeout_secs))
    }

    /// `None` when video assembly is disabled.
    pub fn video_job(&self) -> Result<Option<VideoJob>, TimelapseError> {
        if !self.video.enabled {
            return Ok(None);
        }
        VideoJob::new(
            self.capture.output_dir.clone(),
            self.video.fps,
            self.video.file_name.clone(),
            self.video.width.unwrap_or(self.capture.width),
        )
        .map(Some)
    }

    /// Validate and turn the whole configuration into a runnable plan.
    pub fn plan(&self) -> Result<RunPlan, TimelapseError> {
        self.validate()?;
        Ok(RunPlan {
            session: self.session()?,
            browser: self.browser_options(),
            video: self.video_job()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runnable() -> TimelapseConfig {
        let mut config = TimelapseConfig::default();
        config.capture.url = "https://example.com".into();
        config.capture.shots = Some(3);
        config
    }

    #[test]
    fn test_default_config() {
        let config = TimelapseConfig::default();
        assert_eq!(config.capture.interval_secs, 300.0);
        assert_eq!((config.capture.width, config.capture.height), (1280, 800));
        assert_eq!(config.capture.load_wait_secs, 3.0);
        assert_eq!(config.capture.output_dir, PathBuf::from("./captures"));
        assert_eq!(config.video.fps, 12);
        assert_eq!(config.video.file_name, "timelapse.mp4");
        assert_eq!(config.browser.page_load_timeout_secs, 120);
    }

    #[test]
    fn test_config_validation() {
        assert!(runnable().validate().is_ok());
        // No URL and no tick count
        assert!(TimelapseConfig::default().validate().is_err());

        let mut both = runnable();
        both.capture.duration_secs = Some(60.0);
        assert!(both.validate().is_err());

        let mut zero_interval = runnable();
        zero_interval.capture.interval_secs = 0.0;
        assert!(zero_interval.validate().is_err());

        let mut negative_wait = runnable();
        negative_wait.capture.load_wait_secs = -1.0;
        assert!(negative_wait.validate().is_err());

        let mut bad_fps = runnable();
        bad_fps.video.fps = 0;
        assert!(bad_fps.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TimelapseConfig = toml::from_str(
            r#"
            [capture]
            url = "https://example.com"
            duration_secs = 100.0
            interval_secs = 30.0
            "#,
        )
        .unwrap();
        assert_eq!(config.capture.width, 1280);
        assert!(config.video.enabled);

        let plan = config.plan().unwrap();
        assert_eq!(plan.session.ticks(), 3);
        assert_eq!(plan.video.unwrap().width(), 1280);
    }

    #[test]
    fn test_plan_wires_sections() {
        let mut config = runnable();
        config.capture.full_page = true;
        config.video.width = Some(640);
        config.browser.page_load_timeout_secs = 30;

        let plan = config.plan().unwrap();
        assert!(plan.session.full_page());
        assert_eq!(plan.session.ticks(), 3);
        assert_eq!(plan.browser.page_load_timeout, Duration::from_secs(30));
        assert_eq!(plan.video.unwrap().width(), 640);

        config.video.enabled = false;
        assert!(config.plan().unwrap().video.is_none());
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("nested").join("webtimelapse.toml");

        let config = runnable();
        config.save_to_file(&config_path).unwrap();

        let loaded = TimelapseConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded, config);

        let toml_string = fs::read_to_string(&config_path).unwrap();
        assert!(toml_string.contains("[capture]"));
        assert!(toml_string.contains("[video]"));
        assert!(toml_string.contains("[browser]"));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let loaded = TimelapseConfig::load_from_file("nonexistent_webtimelapse.toml").unwrap();
        assert_eq!(loaded, TimelapseConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[capture\nurl = 1").unwrap();
        assert!(matches!(
            TimelapseConfig::load_from_file(&path),
            Err(TimelapseError::InvalidConfig(_))
        ));
    }
}
