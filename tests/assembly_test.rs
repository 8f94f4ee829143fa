//! Frame assembly against a real directory and the recording encoder.

use filetime::FileTime;
use std::collections::BTreeSet;
use std::path::Path;
use tempfile::TempDir;
use webtimelapse::assembly::{assemble, AssemblyError, AssemblyOutcome, VideoJob};
use webtimelapse::testing::MockEncoder;

fn write_frame(dir: &Path, name: &str, mtime_secs: i64) {
    let path = dir.join(name);
    std::fs::write(&path, name.as_bytes()).unwrap();
    filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime_secs, 0)).unwrap();
}

fn listing(dir: &Path) -> BTreeSet<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

fn job(dir: &TempDir) -> VideoJob {
    VideoJob::new(dir.path(), 24, "timelapse.mp4", 1280).unwrap()
}

/// Names sort one way, modification times the other.
fn scrambled_store() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_frame(dir.path(), "screenshot_000002_20240101-000000.png", 1_000);
    write_frame(dir.path(), "screenshot_000000_20240101-000200.png", 2_000);
    write_frame(dir.path(), "screenshot_000001_20240101-000100.png", 3_000);
    std::fs::write(dir.path().join("notes.txt"), b"not a frame").unwrap();
    dir
}

#[test]
fn test_frames_are_encoded_in_modification_order() {
    let dir = scrambled_store();
    let encoder = MockEncoder::available();

    let outcome = assemble(&job(&dir), &encoder);
    assert!(outcome.is_success(), "{outcome:?}");

    let calls = encoder.calls();
    assert_eq!(calls.len(), 1);
    let inputs: Vec<(&str, &[u8])> = calls[0]
        .inputs
        .iter()
        .map(|(name, body)| (name.as_str(), body.as_slice()))
        .collect();
    assert_eq!(
        inputs,
        [
            (
                "temp_000000.png",
                b"screenshot_000002_20240101-000000.png".as_slice()
            ),
            (
                "temp_000001.png",
                b"screenshot_000000_20240101-000200.png".as_slice()
            ),
            (
                "temp_000002.png",
                b"screenshot_000001_20240101-000100.png".as_slice()
            ),
        ]
    );
    assert_eq!(calls[0].fps, 24);
    assert_eq!(calls[0].width, 1280);
    assert_eq!(calls[0].output, dir.path().join("timelapse.mp4"));
}

#[test]
fn test_success_restores_names_and_adds_video() {
    let dir = scrambled_store();
    let mut expected = listing(dir.path());
    expected.insert("timelapse.mp4".to_string());

    let outcome = assemble(&job(&dir), &MockEncoder::available());

    match &outcome {
        AssemblyOutcome::Success {
            video,
            frames,
            restore_failures,
        } => {
            assert_eq!(video, &dir.path().join("timelapse.mp4"));
            assert_eq!(*frames, 3);
            assert!(restore_failures.is_empty());
        }
        other => panic!("expected success, got {other:?}"),
    }
    assert_eq!(listing(dir.path()), expected);
}

#[test]
fn test_encoder_failure_restores_store_and_keeps_diagnostics() {
    let dir = scrambled_store();
    let before = listing(dir.path());

    let outcome = assemble(&job(&dir), &MockEncoder::failing());

    match &outcome {
        AssemblyOutcome::Failed {
            error: AssemblyError::EncoderInvocation { status, diagnostics },
            restore_failures,
        } => {
            assert_eq!(status, "status 1");
            assert!(diagnostics.contains("invalid input"));
            assert!(restore_failures.is_empty());
        }
        other => panic!("expected encoder failure, got {other:?}"),
    }
    // The partial video is gone too
    assert_eq!(listing(dir.path()), before);
}

#[test]
fn test_encoder_that_cannot_start_still_restores() {
    let dir = scrambled_store();
    let before = listing(dir.path());

    let outcome = assemble(&job(&dir), &MockEncoder::unspawnable());

    assert!(matches!(
        outcome,
        AssemblyOutcome::Failed {
            error: AssemblyError::EncoderSpawn(_),
            ..
        }
    ));
    assert_eq!(listing(dir.path()), before);
}

#[test]
fn test_no_frames_fails_without_renaming() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("readme.txt"), b"empty store").unwrap();
    let before = listing(dir.path());
    let encoder = MockEncoder::available();

    let outcome = assemble(&job(&dir), &encoder);

    assert!(matches!(
        outcome,
        AssemblyOutcome::Failed {
            error: AssemblyError::NoFrames { .. },
            ..
        }
    ));
    assert!(encoder.calls().is_empty());
    assert_eq!(listing(dir.path()), before);
}

#[test]
fn test_missing_encoder_skips_and_leaves_store_alone() {
    let dir = scrambled_store();
    let before = listing(dir.path());
    let encoder = MockEncoder::unavailable();

    let outcome = assemble(&job(&dir), &encoder);

    match &outcome {
        AssemblyOutcome::Skipped { manual_command } => {
            assert!(manual_command.contains("timelapse.mp4"));
        }
        other => panic!("expected skip, got {other:?}"),
    }
    assert!(outcome.is_skipped());
    assert!(encoder.calls().is_empty());
    assert_eq!(listing(dir.path()), before);
}

#[test]
fn test_existing_video_survives_failed_encode() {
    let dir = scrambled_store();
    std::fs::write(dir.path().join("timelapse.mp4"), b"previous").unwrap();

    let outcome = assemble(&job(&dir), &MockEncoder::failing());

    assert!(!outcome.is_success());
    assert!(dir.path().join("timelapse.mp4").exists());
}
