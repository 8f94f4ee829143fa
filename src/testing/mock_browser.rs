use crate::browser::{BrowserDriver, BrowserError, BrowserLauncher, BrowserOptions, ViewportSize};
use async_trait::async_trait;
use image::{Rgb, RgbImage};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the mock browser should do.
#[derive(Debug, Clone)]
pub struct MockPlan {
    /// Simulated page load time, spent in `navigate`
    pub load_delay: Duration,
    /// 0-based navigation calls that fail
    pub failing_navigations: Vec<usize>,
    /// Navigation call that panics
    pub panic_on_navigation: Option<usize>,
    /// Result of the document height script; `None` makes the script fail
    pub page_height: Option<Value>,
    /// Every snapshot fails
    pub fail_snapshots: bool,
    /// Only snapshots taken while the viewport is taller than this fail
    pub max_snapshot_height: Option<u32>,
    pub fail_close: bool,
}

impl Default for MockPlan {
    fn default() -> Self {
        Self {
            load_delay: Duration::ZERO,
            failing_navigations: Vec::new(),
            panic_on_navigation: None,
            page_height: Some(json!(3000)),
            fail_snapshots: false,
            max_snapshot_height: None,
            fail_close: false,
        }
    }
}

impl MockPlan {
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub fn failing_navigations(mut self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.failing_navigations = calls.into_iter().collect();
        self
    }

    pub fn panic_on_navigation(mut self, call: usize) -> Self {
        self.panic_on_navigation = Some(call);
        self
    }

    pub fn with_page_height(mut self, height: Option<Value>) -> Self {
        self.page_height = height;
        self
    }
}

/// Everything the mock saw, shared between launcher, browser, and test.
#[derive(Debug, Default, Clone)]
pub struct MockStats {
    pub launches: usize,
    pub navigations: Vec<String>,
    pub scripts: Vec<String>,
    pub resizes: Vec<ViewportSize>,
    pub snapshots: Vec<PathBuf>,
    pub close_calls: usize,
}

pub struct MockBrowser {
    plan: MockPlan,
    stats: Arc<Mutex<MockStats>>,
    viewport: ViewportSize,
}

impl MockBrowser {
    pub fn new(plan: MockPlan, viewport: ViewportSize, stats: Arc<Mutex<MockStats>>) -> Self {
        Self {
            plan,
            stats,
            viewport,
        }
    }

    fn stats(&self) -> std::sync::MutexGuard<'_, MockStats> {
        self.stats.lock().expect("mock stats lock poisoned")
    }
}

#[async_trait]
impl BrowserDriver for MockBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        let call = {
            let mut stats = self.stats();
            stats.navigations.push(url.to_string());
            stats.navigations.len() - 1
        };
        if self.plan.panic_on_navigation == Some(call) {
            panic!("mock browser panicked on navigation {call}");
        }
        if !self.plan.load_delay.is_zero() {
            tokio::time::sleep(self.plan.load_delay).await;
        }
        if self.plan.failing_navigations.contains(&call) {
            return Err(BrowserError::timeout(format!(
                "mock navigation {call} timed out"
            )));
        }
        Ok(())
    }

    async fn evaluate_script(&mut self, script: &str) -> Result<Value, BrowserError> {
        self.stats().scripts.push(script.to_string());
        if script.contains("scrollHeight") {
            return self
                .plan
                .page_height
                .clone()
                .ok_or_else(|| BrowserError::script("mock height script failed"));
        }
        Ok(Value::Null)
    }

    async fn set_viewport_size(&mut self, size: ViewportSize) -> Result<(), BrowserError> {
        self.stats().resizes.push(size);
        self.viewport = size;
        Ok(())
    }

    async fn viewport_size(&mut self) -> Result<ViewportSize, BrowserError> {
        Ok(self.viewport)
    }

    async fn save_snapshot(&mut self, path: &Path) -> Result<(), BrowserError> {
        if self.plan.fail_snapshots {
            return Err(BrowserError::snapshot("mock snapshot failed"));
        }
        if let Some(max) = self.plan.max_snapshot_height {
            if self.viewport.height > max {
                return Err(BrowserError::snapshot(format!(
                    "mock viewport {} too tall",
                    self.viewport
                )));
            }
        }

        // A tiny real PNG keeps files cheap while still decodable.
        let shade = (self.stats().snapshots.len() % 256) as u8;
        let image = RgbImage::from_pixel(4, 4, Rgb([shade, shade, shade]));
        image
            .save(path)
            .map_err(|e| BrowserError::snapshot(format!("mock write failed: {e}")))?;

        self.stats().snapshots.push(path.to_path_buf());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        self.stats().close_calls += 1;
        if self.plan.fail_close {
            return Err(BrowserError::protocol("mock close failed"));
        }
        Ok(())
    }
}

/// Hands out [`MockBrowser`]s that all report into the same [`MockStats`].
#[derive(Clone)]
pub struct MockLauncher {
    plan: MockPlan,
    fail_launch: bool,
    stats: Arc<Mutex<MockStats>>,
}

impl MockLauncher {
    pub fn new(plan: MockPlan) -> Self {
        Self {
            plan,
            fail_launch: false,
            stats: Arc::new(Mutex::new(MockStats::default())),
        }
    }

    /// A launcher whose every launch fails.
    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::new(MockPlan::default())
        }
    }

    pub fn stats(&self) -> MockStats {
        self.stats.lock().expect("mock stats lock poisoned").clone()
    }

    pub fn shared_stats(&self) -> Arc<Mutex<MockStats>> {
        self.stats.clone()
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    type Driver = MockBrowser;

    async fn launch(&self, options: &BrowserOptions) -> Result<MockBrowser, BrowserError> {
        self.stats.lock().expect("mock stats lock poisoned").launches += 1;
        if self.fail_launch {
            return Err(BrowserError::launch("mock browser refused to start"));
        }
        Ok(MockBrowser::new(
            self.plan.clone(),
            options.viewport,
            self.stats.clone(),
        ))
    }
}
