use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for ViewportSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// How the browser session is brought up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserOptions {
    /// Initial window size
    pub viewport: ViewportSize,
    /// Navigation gives up after this long
    pub page_load_timeout: Duration,
}

impl BrowserOptions {
    pub const DEFAULT_PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(viewport: ViewportSize) -> Self {
        Self {
            viewport,
            page_load_timeout: Self::DEFAULT_PAGE_LOAD_TIMEOUT,
        }
    }

    pub fn with_page_load_timeout(mut self, timeout: Duration) -> Self {
        self.page_load_timeout = timeout;
        self
    }

    /// Command line switches for a headless, fixed-size Chrome.
    pub fn chrome_args(&self) -> Vec<String> {
        vec![
            "--headless=new".to_string(),
            format!(
                "--window-size={},{}",
                self.viewport.width, self.viewport.height
            ),
            "--disable-gpu".to_string(),
            "--hide-scrollbars".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chrome_args_pin_window_size() {
        let args = BrowserOptions::new(ViewportSize::new(1280, 800)).chrome_args();
        assert!(args.contains(&"--headless=new".to_string()));
        assert!(args.contains(&"--window-size=1280,800".to_string()));
    }

    #[test]
    fn default_page_load_timeout() {
        let options = BrowserOptions::new(ViewportSize::new(800, 600));
        assert_eq!(options.page_load_timeout, Duration::from_secs(120));
        let options = options.with_page_load_timeout(Duration::from_secs(5));
        assert_eq!(options.page_load_timeout, Duration::from_secs(5));
    }
}
