//! One capture attempt against a live browser session.

use super::cancel::CancelToken;
use super::frame::CaptureMode;
use super::session::Session;
use crate::browser::{BrowserDriver, BrowserError, BrowserErrorKind, ViewportSize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

/// Tallest page we will resize the window to.
pub const MAX_FULL_PAGE_HEIGHT: u32 = 20_000;

/// Wait after resizing before the full-page snapshot.
pub const RESIZE_SETTLE: Duration = Duration::from_millis(500);

pub const SCROLL_TO_TOP_SCRIPT: &str = "window.scrollTo(0, 0);";

/// Browsers disagree on which of these is the real content height.
pub const DOCUMENT_HEIGHT_SCRIPT: &str = r#"
const body = document.body, html = document.documentElement;
return Math.max(
  body.scrollHeight, body.offsetHeight, body.clientHeight,
  html.clientHeight, html.scrollHeight, html.offsetHeight
);
"#;

/// Navigate, settle, scroll to top, snapshot.
///
/// Full-page failures degrade to a viewport snapshot. Anything else that
/// fails is returned to the caller.
pub async fn capture_once<B>(
    browser: &mut B,
    session: &Session,
    path: &Path,
    cancel: &CancelToken,
) -> Result<CaptureMode, BrowserError>
where
    B: BrowserDriver + ?Sized,
{
    browser.navigate(session.url()).await?;
    if cancel.sleep(session.settle()).await {
        return Err(BrowserError::cancelled());
    }
    browser.evaluate_script(SCROLL_TO_TOP_SCRIPT).await?;

    if !session.full_page() {
        browser.save_snapshot(path).await?;
        return Ok(CaptureMode::Viewport);
    }

    match full_page_snapshot(browser, path, cancel).await {
        Ok(()) => Ok(CaptureMode::FullPage),
        Err(e) if e.kind == BrowserErrorKind::Cancelled => Err(e),
        Err(e) => {
            log::warn!("Full-page capture failed, using viewport snapshot: {}", e);
            browser.save_snapshot(path).await?;
            Ok(CaptureMode::ViewportFallback)
        }
    }
}

async fn full_page_snapshot<B>(
    browser: &mut B,
    path: &Path,
    cancel: &CancelToken,
) -> Result<(), BrowserError>
where
    B: BrowserDriver + ?Sized,
{
    let reported = browser.evaluate_script(DOCUMENT_HEIGHT_SCRIPT).await?;
    let height = clamp_page_height(&reported)?;
    let original = browser.viewport_size().await?;

    log::debug!("Resizing viewport to {}x{} for full-page capture", original.width, height);
    browser
        .set_viewport_size(ViewportSize::new(original.width, height))
        .await?;
    let result = if cancel.sleep(RESIZE_SETTLE).await {
        Err(BrowserError::cancelled())
    } else {
        browser.save_snapshot(path).await
    };

    // The height probe reads the window height too, so a tall window would
    // never shrink back on later ticks.
    if let Err(e) = browser.set_viewport_size(original).await {
        log::warn!("Could not restore viewport to {}: {}", original, e);
    }
    result
}

/// Interpret the document height reported by the page, capped at
/// [`MAX_FULL_PAGE_HEIGHT`].
pub fn clamp_page_height(reported: &Value) -> Result<u32, BrowserError> {
    let height = reported
        .as_f64()
        .filter(|h| h.is_finite() && *h >= 1.0)
        .ok_or_else(|| {
            BrowserError::script(format!("document height is not a positive number: {reported}"))
        })?;
    Ok(height.min(MAX_FULL_PAGE_HEIGHT as f64) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn height_is_clamped() {
        assert_eq!(clamp_page_height(&json!(4321)).unwrap(), 4321);
        assert_eq!(clamp_page_height(&json!(4321.7)).unwrap(), 4321);
        assert_eq!(clamp_page_height(&json!(250_000)).unwrap(), MAX_FULL_PAGE_HEIGHT);
    }

    #[test]
    fn bad_heights_are_script_errors() {
        for value in [json!(null), json!("tall"), json!(0), json!(-5)] {
            let err = clamp_page_height(&value).unwrap_err();
            assert_eq!(err.kind, BrowserErrorKind::Script, "value {value}");
        }
    }
}
