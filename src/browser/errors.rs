use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserErrorKind {
    Launch,
    Timeout,
    Navigation,
    Script,
    Snapshot,
    Protocol,
    Closed,
    Cancelled,
}

/// Opaque browser failure. The scheduler only ever logs and records these;
/// the kind exists for diagnostics and tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BrowserError {
    pub kind: BrowserErrorKind,
    pub message: String,
}

impl BrowserError {
    pub fn launch(message: impl Into<String>) -> Self {
        Self {
            kind: BrowserErrorKind::Launch,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: BrowserErrorKind::Timeout,
            message: message.into(),
        }
    }

    pub fn navigation(message: impl Into<String>) -> Self {
        Self {
            kind: BrowserErrorKind::Navigation,
            message: message.into(),
        }
    }

    pub fn script(message: impl Into<String>) -> Self {
        Self {
            kind: BrowserErrorKind::Script,
            message: message.into(),
        }
    }

    pub fn snapshot(message: impl Into<String>) -> Self {
        Self {
            kind: BrowserErrorKind::Snapshot,
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self {
            kind: BrowserErrorKind::Protocol,
            message: message.into(),
        }
    }

    pub fn closed() -> Self {
        Self {
            kind: BrowserErrorKind::Closed,
            message: "browser session is closed".to_string(),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            kind: BrowserErrorKind::Cancelled,
            message: "capture interrupted".to_string(),
        }
    }

    /// Map a W3C WebDriver error code onto a kind.
    pub fn from_webdriver(code: &str, message: &str) -> Self {
        let kind = match code {
            "session not created" => BrowserErrorKind::Launch,
            "timeout" | "script timeout" => BrowserErrorKind::Timeout,
            "javascript error" => BrowserErrorKind::Script,
            "invalid session id" | "no such window" => BrowserErrorKind::Closed,
            "insecure certificate" => BrowserErrorKind::Navigation,
            _ => BrowserErrorKind::Protocol,
        };
        Self {
            kind,
            message: if message.is_empty() {
                code.to_string()
            } else {
                format!("{code}: {message}")
            },
        }
    }
}
