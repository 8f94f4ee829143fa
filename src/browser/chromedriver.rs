//! Local `chromedriver` process management.

use super::errors::BrowserError;
use serde_json::Value;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::Instant;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);
const STATUS_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// A `chromedriver` child process listening on a loopback port.
///
/// The child is spawned with `kill_on_drop`, so it dies with this handle
/// even if [`ChromeDriverProcess::shutdown`] never runs.
pub struct ChromeDriverProcess {
    child: Child,
    program: PathBuf,
    endpoint: String,
}

impl ChromeDriverProcess {
    /// Spawn `binary`, or the `chromedriver` found on `PATH`.
    pub fn spawn(binary: Option<&Path>) -> Result<Self, BrowserError> {
        let program = match binary {
            Some(path) => path.to_path_buf(),
            None => which::which("chromedriver").map_err(|e| {
                BrowserError::launch(format!("chromedriver not found on PATH: {e}"))
            })?,
        };

        let port = free_port()?;
        let child = Command::new(&program)
            .arg(format!("--port={port}"))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BrowserError::launch(format!("failed to start {}: {e}", program.display()))
            })?;

        log::info!("Started {} on port {}", program.display(), port);
        Ok(Self {
            child,
            program,
            endpoint: format!("http://127.0.0.1:{port}"),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Poll `/status` until the driver reports ready.
    pub async fn wait_until_ready(
        &mut self,
        http: &reqwest::Client,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let deadline = Instant::now() + timeout;
        let status_url = format!("{}/status", self.endpoint);

        loop {
            let exited = self
                .child
                .try_wait()
                .map_err(|e| BrowserError::launch(format!("failed to poll chromedriver: {e}")))?;
            if let Some(status) = exited {
                return Err(BrowserError::launch(format!(
                    "{} exited during startup: {status}",
                    self.program.display()
                )));
            }

            let probe = http
                .get(&status_url)
                .timeout(STATUS_REQUEST_TIMEOUT)
                .send()
                .await;
            if let Ok(response) = probe {
                if let Ok(body) = response.json::<Value>().await {
                    if body["value"]["ready"].as_bool() == Some(true) {
                        log::debug!("chromedriver ready at {}", self.endpoint);
                        return Ok(());
                    }
                }
            }

            if Instant::now() >= deadline {
                return Err(BrowserError::timeout(format!(
                    "chromedriver not ready after {:.1}s",
                    timeout.as_secs_f64()
                )));
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    pub async fn shutdown(mut self) -> Result<(), BrowserError> {
        self.child
            .kill()
            .await
            .map_err(|e| BrowserError::protocol(format!("failed to stop chromedriver: {e}")))
    }
}

fn free_port() -> Result<u16, BrowserError> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|e| BrowserError::launch(format!("no free local port: {e}")))?;
    listener
        .local_addr()
        .map(|addr| addr.port())
        .map_err(|e| BrowserError::launch(format!("no free local port: {e}")))
}
