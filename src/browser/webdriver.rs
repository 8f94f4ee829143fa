//! W3C WebDriver client.
//!
//! Speaks the HTTP/JSON wire protocol to a WebDriver endpoint (normally
//! `chromedriver`). Only the handful of commands the scheduler needs are
//! implemented.

use super::chromedriver::ChromeDriverProcess;
use super::errors::BrowserError;
use super::types::{BrowserOptions, ViewportSize};
use super::{BrowserDriver, BrowserLauncher};
use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Extra time granted to each HTTP request on top of the page-load timeout,
/// so the driver's own timeout error wins over the transport's.
const HTTP_TIMEOUT_SLACK: Duration = Duration::from_secs(30);
const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(20);

pub struct WebDriverClient {
    http: Client,
    endpoint: String,
    session_id: String,
    process: Option<ChromeDriverProcess>,
    closed: bool,
}

impl WebDriverClient {
    /// Create a new session on `endpoint`.
    ///
    /// When `process` is given the client owns it and stops it on close.
    pub async fn new_session(
        http: Client,
        endpoint: &str,
        options: &BrowserOptions,
        process: Option<ChromeDriverProcess>,
    ) -> Result<Self, BrowserError> {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let body = new_session_body(options);

        let value = send(http.post(format!("{endpoint}/session")).json(&body))
            .await
            .map_err(|e| BrowserError::launch(format!("could not create session: {e}")))?;

        let session_id = value["sessionId"]
            .as_str()
            .ok_or_else(|| BrowserError::launch("new session response has no sessionId"))?
            .to_string();

        log::info!("WebDriver session {} created on {}", session_id, endpoint);
        Ok(Self {
            http,
            endpoint,
            session_id,
            process,
            closed: false,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn url(&self, command: &str) -> String {
        format!("{}/session/{}/{}", self.endpoint, self.session_id, command)
    }

    fn ensure_open(&self) -> Result<(), BrowserError> {
        if self.closed {
            return Err(BrowserError::closed());
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for WebDriverClient {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.ensure_open()?;
        send(self.http.post(self.url("url")).json(&json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn evaluate_script(&mut self, script: &str) -> Result<Value, BrowserError> {
        self.ensure_open()?;
        send(
            self.http
                .post(self.url("execute/sync"))
                .json(&json!({ "script": script, "args": [] })),
        )
        .await
    }

    async fn set_viewport_size(&mut self, size: ViewportSize) -> Result<(), BrowserError> {
        self.ensure_open()?;
        send(
            self.http
                .post(self.url("window/rect"))
                .json(&json!({ "width": size.width, "height": size.height })),
        )
        .await
        .map(|_| ())
    }

    async fn viewport_size(&mut self) -> Result<ViewportSize, BrowserError> {
        self.ensure_open()?;
        let rect = send(self.http.get(self.url("window/rect"))).await?;
        parse_rect(&rect)
    }

    async fn save_snapshot(&mut self, path: &Path) -> Result<(), BrowserError> {
        self.ensure_open()?;
        let value = send(self.http.get(self.url("screenshot"))).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| BrowserError::snapshot("screenshot response is not a string"))?;
        let png = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| BrowserError::snapshot(format!("screenshot is not valid base64: {e}")))?;

        tokio::fs::write(path, &png).await.map_err(|e| {
            BrowserError::snapshot(format!("failed to write {}: {e}", path.display()))
        })
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let deleted = send(
            self.http
                .delete(format!("{}/session/{}", self.endpoint, self.session_id)),
        )
        .await;
        if let Err(e) = &deleted {
            log::warn!("Failed to delete WebDriver session {}: {}", self.session_id, e);
        }

        if let Some(process) = self.process.take() {
            process.shutdown().await?;
        }
        log::info!("WebDriver session {} released", self.session_id);
        deleted.map(|_| ())
    }
}

/// Launches sessions either against a running WebDriver endpoint or by
/// spawning a local `chromedriver`.
#[derive(Debug, Clone)]
pub struct WebDriverLauncher {
    endpoint: Option<String>,
    chromedriver: Option<PathBuf>,
    startup_timeout: Duration,
}

impl Default for WebDriverLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl WebDriverLauncher {
    pub fn new() -> Self {
        Self {
            endpoint: None,
            chromedriver: None,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }

    /// Connect to an already running WebDriver server instead of spawning one.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_chromedriver(mut self, path: impl Into<PathBuf>) -> Self {
        self.chromedriver = Some(path.into());
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    type Driver = WebDriverClient;

    async fn launch(&self, options: &BrowserOptions) -> Result<WebDriverClient, BrowserError> {
        let http = Client::builder()
            .timeout(options.page_load_timeout + HTTP_TIMEOUT_SLACK)
            .build()
            .map_err(|e| BrowserError::launch(format!("failed to build HTTP client: {e}")))?;

        match &self.endpoint {
            Some(endpoint) => WebDriverClient::new_session(http, endpoint, options, None).await,
            None => {
                let mut process = ChromeDriverProcess::spawn(self.chromedriver.as_deref())?;
                process
                    .wait_until_ready(&http, self.startup_timeout)
                    .await?;
                let endpoint = process.endpoint().to_string();
                // A failed session drops `process`, which kills the child.
                WebDriverClient::new_session(http, &endpoint, options, Some(process)).await
            }
        }
    }
}

fn new_session_body(options: &BrowserOptions) -> Value {
    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "goog:chromeOptions": { "args": options.chrome_args() },
                "timeouts": { "pageLoad": options.page_load_timeout.as_millis() as u64 }
            }
        }
    })
}

fn parse_rect(rect: &Value) -> Result<ViewportSize, BrowserError> {
    let dimension = |key: &str| {
        rect[key]
            .as_f64()
            .filter(|v| *v >= 0.0)
            .map(|v| v as u32)
            .ok_or_else(|| BrowserError::protocol(format!("window rect has no valid {key}: {rect}")))
    };
    Ok(ViewportSize::new(dimension("width")?, dimension("height")?))
}

async fn send(request: RequestBuilder) -> Result<Value, BrowserError> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| BrowserError::protocol(format!("invalid WebDriver response ({status}): {e}")))?;

    let value = match body {
        Value::Object(mut map) => map.remove("value").unwrap_or(Value::Null),
        other => other,
    };

    if status.is_success() {
        Ok(value)
    } else {
        let code = value["error"].as_str().unwrap_or("unknown error");
        let message = value["message"].as_str().unwrap_or_default();
        Err(BrowserError::from_webdriver(code, message))
    }
}

fn transport_error(error: reqwest::Error) -> BrowserError {
    if error.is_timeout() {
        BrowserError::timeout(format!("WebDriver request timed out: {error}"))
    } else {
        BrowserError::protocol(format!("WebDriver request failed: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::BrowserErrorKind;

    #[test]
    fn session_body_requests_headless_chrome() {
        let options = BrowserOptions::new(ViewportSize::new(1024, 768))
            .with_page_load_timeout(Duration::from_secs(60));
        let body = new_session_body(&options);
        let caps = &body["capabilities"]["alwaysMatch"];

        assert_eq!(caps["browserName"], "chrome");
        assert_eq!(caps["timeouts"]["pageLoad"], 60_000);
        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.iter().any(|a| a == "--headless=new"));
        assert!(args.iter().any(|a| a == "--window-size=1024,768"));
    }

    #[test]
    fn rect_parses_fractional_dimensions() {
        let rect = json!({ "x": 0, "y": 0, "width": 1280.0, "height": 799.5 });
        assert_eq!(parse_rect(&rect).unwrap(), ViewportSize::new(1280, 799));
    }

    #[test]
    fn rect_without_height_is_protocol_error() {
        let err = parse_rect(&json!({ "width": 10 })).unwrap_err();
        assert_eq!(err.kind, BrowserErrorKind::Protocol);
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_launch() {
        let launcher = WebDriverLauncher::new().with_endpoint("http://127.0.0.1:9");
        let options = BrowserOptions::new(ViewportSize::new(800, 600))
            .with_page_load_timeout(Duration::from_secs(1));
        match launcher.launch(&options).await {
            Err(e) => assert_eq!(e.kind, BrowserErrorKind::Launch),
            Ok(_) => panic!("nothing listens on the discard port"),
        }
    }
}
