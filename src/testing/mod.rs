//! Testing utilities for webtimelapse
//!
//! Scripted stand-ins for the browser and the encoder, so the scheduler and
//! the assembly pipeline can be exercised without Chrome or ffmpeg.

pub mod mock_browser;
pub mod mock_encoder;

pub use mock_browser::{MockBrowser, MockLauncher, MockPlan, MockStats};
pub use mock_encoder::{EncodeCall, MockEncoder};
