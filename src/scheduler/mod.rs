//! Capture scheduling
//!
//! Runs a fixed number of ticks against one long-lived browser session,
//! keeping tick starts one interval apart. A tick that overruns the interval
//! is followed immediately by the next one.
//! A failed capture only fails its own tick.
//!
//! # Example
//! ```rust,ignore
//! use webtimelapse::scheduler::{Scheduler, Session};
//! use webtimelapse::browser::WebDriverLauncher;
//!
//! let session = Session::builder("https://example.com", "captures")
//!     .interval(Duration::from_secs(60))
//!     .shots(10)
//!     .build()?;
//! let run = Scheduler::new(session, WebDriverLauncher::new()).run().await?;
//! println!("{} frames captured", run.succeeded());
//! ```

mod cancel;
mod capture;
mod frame;
mod runner;
mod session;

pub use cancel::CancelToken;
pub use capture::{
    capture_once, clamp_page_height, DOCUMENT_HEIGHT_SCRIPT, MAX_FULL_PAGE_HEIGHT,
    RESIZE_SETTLE, SCROLL_TO_TOP_SCRIPT,
};
pub use frame::{
    frame_file_name, is_frame_file, CaptureMode, CaptureOutcome, Frame, FRAME_EXTENSION,
    FRAME_PREFIX,
};
pub use runner::{CaptureRun, Completion, Scheduler, SchedulerState, TickObserver};
pub use session::{Session, SessionBuilder, TickCount};
