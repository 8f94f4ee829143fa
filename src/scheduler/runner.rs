use super::cancel::CancelToken;
use super::capture::capture_once;
use super::frame::{frame_file_name, CaptureOutcome, Frame};
use super::session::Session;
use crate::browser::{BrowserDriver, BrowserErrorKind, BrowserLauncher, BrowserOptions};
use crate::errors::TimelapseError;
use crate::timing::{cadence_delay, serialize_secs, TickClock};
use chrono::Local;
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Acquiring,
    /// Working on the tick with this sequence index
    Ticking(u32),
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    Finished,
    Interrupted,
}

/// Everything the scheduler produced.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureRun {
    pub frames: Vec<Frame>,
    pub completion: Completion,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    /// Set when the browser release itself reported an error
    pub release_error: Option<String>,
}

impl CaptureRun {
    pub fn succeeded(&self) -> usize {
        self.frames.iter().filter(|f| f.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.frames.len() - self.succeeded()
    }

    pub fn interrupted(&self) -> bool {
        self.completion == Completion::Interrupted
    }
}

/// Called after every tick with the finished frame and the total tick count.
pub type TickObserver = Box<dyn FnMut(&Frame, u32) + Send>;

/// Drives the ticks of one [`Session`] against one browser session.
///
/// `Idle -> Acquiring -> Ticking(i) -> Released`. A scheduler runs once.
pub struct Scheduler<L: BrowserLauncher> {
    session: Session,
    launcher: L,
    options: BrowserOptions,
    cancel: CancelToken,
    observer: Option<TickObserver>,
    state: SchedulerState,
}

impl<L: BrowserLauncher> Scheduler<L> {
    pub fn new(session: Session, launcher: L) -> Self {
        let options = BrowserOptions::new(session.viewport());
        Self {
            session,
            launcher,
            options,
            cancel: CancelToken::new(),
            observer: None,
            state: SchedulerState::Idle,
        }
    }

    pub fn with_browser_options(mut self, options: BrowserOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn on_tick(mut self, observer: impl FnMut(&Frame, u32) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn with_observer(mut self, observer: Option<TickObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Acquire the browser, run every tick, release the browser.
    ///
    /// Only a failed acquisition is an error. The browser is closed exactly
    /// once on every other path, including interruption and a panic inside
    /// the loop (which is re-raised after the release).
    pub async fn run(&mut self) -> Result<CaptureRun, TimelapseError> {
        if self.state != SchedulerState::Idle {
            return Err(TimelapseError::AlreadyRun);
        }

        self.state = SchedulerState::Acquiring;
        log::info!(
            "Starting capture of {} every {:.1}s for {} ticks",
            self.session.url(),
            self.session.interval().as_secs_f64(),
            self.session.ticks()
        );

        let mut browser = match self.launcher.launch(&self.options).await {
            Ok(browser) => browser,
            Err(e) => {
                log::error!("Failed to acquire browser session: {}", e);
                self.state = SchedulerState::Released;
                return Err(TimelapseError::SessionAcquisition(e));
            }
        };

        let clock = TickClock::new();
        let outcome = AssertUnwindSafe(self.tick_loop(&mut browser, &clock))
            .catch_unwind()
            .await;

        let release_error = match browser.close().await {
            Ok(()) => None,
            Err(e) => {
                log::warn!("Error releasing browser session: {}", e);
                Some(e.to_string())
            }
        };
        self.state = SchedulerState::Released;

        let (frames, completion) = match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        };

        let run = CaptureRun {
            frames,
            completion,
            elapsed: clock.elapsed(),
            release_error,
        };
        log::info!(
            "Capture finished ({:?}): {} ok, {} failed in {:.1}s",
            run.completion,
            run.succeeded(),
            run.failed(),
            run.elapsed.as_secs_f64()
        );
        Ok(run)
    }

    async fn tick_loop(
        &mut self,
        browser: &mut L::Driver,
        clock: &TickClock,
    ) -> (Vec<Frame>, Completion) {
        let total = self.session.ticks();
        let mut frames = Vec::new();

        for sequence in 0..total {
            if self.cancel.is_cancelled() {
                return (frames, Completion::Interrupted);
            }
            self.state = SchedulerState::Ticking(sequence);

            let tick_start = Instant::now();
            let Some(frame) = tick(
                browser,
                &self.session,
                &self.cancel,
                sequence,
                tick_start,
                clock,
            )
            .await
            else {
                log::info!("Tick {} interrupted before its snapshot", sequence);
                return (frames, Completion::Interrupted);
            };
            if let Some(observer) = self.observer.as_mut() {
                observer(&frame, total);
            }
            frames.push(frame);

            if sequence + 1 < total {
                let delay = cadence_delay(self.session.interval(), tick_start.elapsed());
                if delay.is_zero() {
                    log::debug!("Tick {} overran the interval, starting next tick now", sequence);
                }
                if self.cancel.sleep(delay).await {
                    return (frames, Completion::Interrupted);
                }
            }
        }

        if self.cancel.is_cancelled() {
            (frames, Completion::Interrupted)
        } else {
            (frames, Completion::Finished)
        }
    }
}

/// Run one tick. `None` means the tick was interrupted mid-capture and
/// leaves no frame behind.
async fn tick<B: BrowserDriver + ?Sized>(
    browser: &mut B,
    session: &Session,
    cancel: &CancelToken,
    sequence: u32,
    tick_start: Instant,
    clock: &TickClock,
) -> Option<Frame> {
    let captured_at = Local::now();
    let path = session
        .output_dir()
        .join(frame_file_name(sequence, &captured_at));

    log::debug!("Tick {}: capturing {}", sequence, path.display());
    let result = capture_once(browser, session, &path, cancel).await;

    let (outcome, mode, dimensions) = match result {
        Ok(mode) => (
            CaptureOutcome::Success,
            Some(mode),
            image::image_dimensions(&path).ok(),
        ),
        Err(e) if e.kind == BrowserErrorKind::Cancelled => return None,
        Err(e) => {
            log::warn!(
                "Capture {} of {} failed: {}",
                sequence + 1,
                session.ticks(),
                e
            );
            (CaptureOutcome::Failed(e.to_string()), None, None)
        }
    };

    Some(Frame {
        sequence,
        captured_at,
        path,
        outcome,
        mode,
        dimensions,
        offset: clock.offset(tick_start),
        capture_time: tick_start.elapsed(),
    })
}
