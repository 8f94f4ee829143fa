//! One complete run: capture every tick, then assemble the video.

use crate::assembly::{assemble, AssemblyOutcome, FrameEncoder, VideoJob};
use crate::browser::{BrowserLauncher, BrowserOptions};
use crate::errors::TimelapseError;
use crate::scheduler::{CancelToken, CaptureRun, Scheduler, Session, TickObserver};
use serde::Serialize;

/// Everything needed to start a run.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub session: Session,
    pub browser: BrowserOptions,
    /// `None` skips assembly
    pub video: Option<VideoJob>,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub session: Session,
    pub capture: CaptureRun,
    /// `None` when assembly was disabled or the run was interrupted
    pub assembly: Option<AssemblyOutcome>,
    /// Set when the operator interrupted either phase
    pub interrupted: bool,
}

impl RunReport {
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }
}

/// Capture the session, then hand the frame store to the encoder.
///
/// An interrupted capture skips assembly. The encoder runs on the blocking
/// pool. An interrupt that lands while it runs still marks the report as
/// interrupted.
pub async fn run_timelapse<L, E>(
    plan: RunPlan,
    launcher: L,
    encoder: E,
    cancel: CancelToken,
    observer: Option<TickObserver>,
) -> Result<RunReport, TimelapseError>
where
    L: BrowserLauncher,
    E: FrameEncoder + Send + 'static,
{
    let RunPlan {
        session,
        browser,
        video,
    } = plan;

    let output_dir = session.output_dir();
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|e| TimelapseError::io(output_dir, e))?;

    let mut scheduler = Scheduler::new(session.clone(), launcher)
        .with_browser_options(browser)
        .with_cancel_token(cancel.clone())
        .with_observer(observer);
    let capture = scheduler.run().await?;

    let assembly = match video {
        Some(_) if capture.interrupted() => {
            log::warn!("Run interrupted, skipping video assembly");
            None
        }
        Some(job) => {
            let outcome = tokio::task::spawn_blocking(move || assemble(&job, &encoder))
                .await
                .map_err(|e| TimelapseError::Task(format!("video assembly: {e}")))?;
            Some(outcome)
        }
        None => None,
    };

    // An interrupt during encoding kills the encoder along with us
    let interrupted = capture.interrupted() || cancel.is_cancelled();
    if interrupted && !capture.interrupted() {
        log::warn!("Run interrupted during video assembly");
    }

    Ok(RunReport {
        session,
        capture,
        assembly,
        interrupted,
    })
}
