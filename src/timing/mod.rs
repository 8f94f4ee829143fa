//! Cadence timing for the capture loop
//!
//! All scheduler timestamps come from `tokio::time::Instant`, so tests can
//! drive the loop under paused time.

use crate::errors::TimelapseError;
use serde::Serializer;
use std::time::Duration;
use tokio::time::Instant;

/// Monotonic clock anchored at session start
///
/// Tick-start offsets are measured against this single origin.
#[derive(Debug, Clone, Copy)]
pub struct TickClock {
    start: Instant,
}

impl TickClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn from_instant(start: Instant) -> Self {
        Self { start }
    }

    /// Offset of `instant` from the clock origin
    #[inline]
    pub fn offset(&self, instant: Instant) -> Duration {
        instant.saturating_duration_since(self.start)
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn start_instant(&self) -> Instant {
        self.start
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Sleep needed before the next tick starts.
///
/// Subtracts the current tick's processing time from the nominal interval.
/// An overrun yields zero; earlier drift is never made up.
#[inline]
pub fn cadence_delay(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

/// Resolve a total duration into a tick count: `max(1, round(duration / interval))`.
///
/// Halves round to even. Whatever is left of `duration` beyond
/// `ticks * interval` is not captured. A zero interval or a count that does
/// not fit in a `u32` is a configuration error.
pub fn ticks_for_duration(duration: Duration, interval: Duration) -> Result<u32, TimelapseError> {
    if interval.is_zero() {
        return Err(TimelapseError::invalid_config(
            "interval must be greater than zero",
        ));
    }
    let ticks = (duration.as_secs_f64() / interval.as_secs_f64()).round_ties_even();
    if ticks > u32::MAX as f64 {
        return Err(TimelapseError::invalid_config(format!(
            "duration {:.0}s at {:.3}s intervals needs more than {} ticks",
            duration.as_secs_f64(),
            interval.as_secs_f64(),
            u32::MAX
        )));
    }
    Ok(ticks.max(1.0) as u32)
}

/// Serialize a `Duration` as fractional seconds.
pub fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}
