//! Browser capability used by the capture scheduler.
//!
//! The scheduler only talks to [`BrowserDriver`] and [`BrowserLauncher`].
//! The WebDriver client (behind the `webdriver` feature) is the production
//! implementation; `crate::testing` has scripted mocks.

pub mod errors;
pub mod types;

#[cfg(feature = "webdriver")]
pub mod chromedriver;
#[cfg(feature = "webdriver")]
pub mod webdriver;

pub use errors::{BrowserError, BrowserErrorKind};
pub use types::{BrowserOptions, ViewportSize};

#[cfg(feature = "webdriver")]
pub use webdriver::{WebDriverClient, WebDriverLauncher};

use async_trait::async_trait;
use std::path::Path;

/// A live browser session.
#[async_trait]
pub trait BrowserDriver: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    async fn evaluate_script(&mut self, script: &str) -> Result<serde_json::Value, BrowserError>;

    async fn set_viewport_size(&mut self, size: ViewportSize) -> Result<(), BrowserError>;

    async fn viewport_size(&mut self) -> Result<ViewportSize, BrowserError>;

    /// Write a raster snapshot of the current viewport to `path`.
    async fn save_snapshot(&mut self, path: &Path) -> Result<(), BrowserError>;

    /// Release the session. Called exactly once by the scheduler.
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Acquires a [`BrowserDriver`].
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    type Driver: BrowserDriver;

    async fn launch(&self, options: &BrowserOptions) -> Result<Self::Driver, BrowserError>;
}
