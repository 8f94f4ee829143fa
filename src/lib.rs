//! webtimelapse: capture a webpage at fixed intervals and turn the frames
//! into a timelapse video.
//!
//! A run has two stages:
//! - the [`scheduler`] drives one headless browser session through a fixed
//!   number of ticks, saving one PNG per successful capture
//! - the [`assembly`] pipeline orders those frames by modification time and
//!   feeds them to an external encoder (ffmpeg)
//!
//! The browser and the encoder sit behind the [`browser::BrowserLauncher`]
//! and [`assembly::FrameEncoder`] traits; [`testing`] has scripted mocks.
//!
//! # Usage
//! ```rust,ignore
//! use webtimelapse::{run_timelapse, CancelToken, FfmpegEncoder, TimelapseConfig};
//! use webtimelapse::browser::WebDriverLauncher;
//!
//! let mut config = TimelapseConfig::default();
//! config.capture.url = "https://example.com".into();
//! config.capture.shots = Some(10);
//!
//! let report = run_timelapse(
//!     config.plan()?,
//!     WebDriverLauncher::new(),
//!     FfmpegEncoder::new(),
//!     CancelToken::new(),
//!     None,
//! )
//! .await?;
//! ```
pub mod assembly;
pub mod browser;
pub mod config;
pub mod errors;
pub mod run;
pub mod scheduler;
pub mod timing;

// Testing utilities - scripted browser and encoder
pub mod testing;

// Re-exports for convenience
pub use assembly::{assemble, AssemblyOutcome, FfmpegEncoder, FrameEncoder, VideoJob};
pub use browser::{BrowserError, BrowserErrorKind, BrowserOptions, ViewportSize};
pub use config::TimelapseConfig;
pub use errors::TimelapseError;
pub use run::{run_timelapse, RunPlan, RunReport};
pub use scheduler::{CancelToken, CaptureRun, Frame, Scheduler, Session};

/// Initialize logging for the library and CLI
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "webtimelapse=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
