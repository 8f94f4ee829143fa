//! Property-Based Tests for webtimelapse
//!
//! Run with: cargo test --test timelapse_props

use filetime::FileTime;
use proptest::prelude::*;
use std::time::Duration;
use tempfile::tempdir;
use webtimelapse::assembly::{assemble, VideoJob};
use webtimelapse::scheduler::{Scheduler, Session};
use webtimelapse::testing::{MockEncoder, MockLauncher, MockPlan};
use webtimelapse::timing::{cadence_delay, ticks_for_duration};

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The next tick never starts before the interval is up, and never
    /// waits at all once a tick has overrun it.
    #[test]
    fn cadence_keeps_tick_starts_apart(interval_ms in 1u64..600_000, elapsed_ms in 0u64..900_000) {
        let interval = Duration::from_millis(interval_ms);
        let elapsed = Duration::from_millis(elapsed_ms);
        let delay = cadence_delay(interval, elapsed);

        if elapsed < interval {
            prop_assert_eq!(elapsed + delay, interval);
        } else {
            prop_assert_eq!(delay, Duration::ZERO);
        }
    }

    /// Duration-based sessions always run at least once and land within
    /// half a tick of the requested duration.
    #[test]
    fn tick_count_rounds_duration(duration_s in 0u64..100_000, interval_s in 1u64..3_600) {
        let ticks = ticks_for_duration(
            Duration::from_secs(duration_s),
            Duration::from_secs(interval_s),
        )
        .unwrap();
        prop_assert!(ticks >= 1);

        let exact = duration_s as f64 / interval_s as f64;
        if exact >= 1.0 {
            prop_assert!((ticks as f64 - exact).abs() <= 0.5);
        }
    }

    /// N ticks give N frames indexed 0..N-1 whichever captures fail.
    #[test]
    fn every_tick_yields_one_frame(
        shots in 1u32..8,
        failing in proptest::collection::vec(0usize..8, 0..8),
    ) {
        let dir = tempdir().unwrap();
        let session = Session::builder("https://example.com", dir.path())
            .interval(Duration::from_secs(60))
            .shots(shots)
            .settle(Duration::ZERO)
            .build()
            .unwrap();
        let launcher = MockLauncher::new(MockPlan::default().failing_navigations(failing.clone()));

        let run = paused_runtime()
            .block_on(Scheduler::new(session, launcher.clone()).run())
            .unwrap();

        let sequences: Vec<u32> = run.frames.iter().map(|f| f.sequence).collect();
        prop_assert_eq!(sequences, (0..shots).collect::<Vec<_>>());
        let expected_failures = (0..shots as usize).filter(|i| failing.contains(i)).count();
        prop_assert_eq!(run.failed(), expected_failures);
        prop_assert_eq!(launcher.stats().close_calls, 1);
    }

    /// Staged ordinals follow modification time, never file names, and
    /// every original name is back afterwards.
    #[test]
    fn staging_follows_modification_time(
        mtimes in proptest::sample::subsequence((1_000i64..2_000).collect::<Vec<_>>(), 1..12)
            .prop_shuffle(),
    ) {
        let dir = tempdir().unwrap();
        let mut names = Vec::new();
        for (index, mtime) in mtimes.iter().enumerate() {
            let name = format!("screenshot_{index:06}_20240101-000000.png");
            let path = dir.path().join(&name);
            std::fs::write(&path, &name).unwrap();
            filetime::set_file_mtime(&path, FileTime::from_unix_time(*mtime, 0)).unwrap();
            names.push(name);
        }

        let encoder = MockEncoder::available();
        let job = VideoJob::new(dir.path(), 12, "timelapse.mp4", 640).unwrap();
        prop_assert!(assemble(&job, &encoder).is_success());

        let mut by_time: Vec<(i64, &String)> = mtimes.iter().copied().zip(&names).collect();
        by_time.sort();
        let staged: Vec<Vec<u8>> = encoder.calls()[0]
            .inputs
            .iter()
            .map(|(_, body)| body.clone())
            .collect();
        let expected: Vec<Vec<u8>> = by_time.iter().map(|(_, n)| n.as_bytes().to_vec()).collect();
        prop_assert_eq!(staged, expected);

        for name in &names {
            prop_assert!(dir.path().join(name).exists());
        }
    }
}
