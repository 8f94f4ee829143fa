use super::config::VideoJob;
use super::encoder::{EncodeRequest, FrameEncoder};
use crate::scheduler::{is_frame_file, FRAME_EXTENSION};
use serde::{Serialize, Serializer};
use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

pub const TEMP_PREFIX: &str = "temp_";

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("no frames found in {}", dir.display())]
    NoFrames { dir: PathBuf },
    #[error("failed to read frame store {}: {source}", path.display())]
    FrameStore {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to stage {} as {}: {source}", from.display(), to.display())]
    Stage {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("temporary file {} already exists", .0.display())]
    TemporaryExists(PathBuf),
    #[error("failed to start encoder: {0}")]
    EncoderSpawn(#[source] io::Error),
    #[error("encoder exited with {status}: {diagnostics}")]
    EncoderInvocation { status: String, diagnostics: String },
}

/// A temporary file that could not be renamed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreFailure {
    pub temporary: PathBuf,
    pub original: PathBuf,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssemblyOutcome {
    Success {
        video: PathBuf,
        frames: usize,
        restore_failures: Vec<RestoreFailure>,
    },
    /// Encoder missing; the frame store was not touched.
    Skipped { manual_command: String },
    Failed {
        #[serde(serialize_with = "serialize_display")]
        error: AssemblyError,
        restore_failures: Vec<RestoreFailure>,
    },
}

impl AssemblyOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AssemblyOutcome::Success { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, AssemblyOutcome::Skipped { .. })
    }

    pub fn video(&self) -> Option<&Path> {
        match self {
            AssemblyOutcome::Success { video, .. } => Some(video),
            _ => None,
        }
    }

    pub fn restore_failures(&self) -> &[RestoreFailure] {
        match self {
            AssemblyOutcome::Success {
                restore_failures, ..
            }
            | AssemblyOutcome::Failed {
                restore_failures, ..
            } => restore_failures,
            AssemblyOutcome::Skipped { .. } => &[],
        }
    }

    fn failed(error: AssemblyError, restore_failures: Vec<RestoreFailure>) -> Self {
        log::error!("Video assembly failed: {}", error);
        AssemblyOutcome::Failed {
            error,
            restore_failures,
        }
    }
}

fn serialize_display<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

pub fn temp_file_name(ordinal: usize) -> String {
    format!("{TEMP_PREFIX}{ordinal:06}.{FRAME_EXTENSION}")
}

/// Frame files in `dir`, oldest modification time first.
///
/// Equal times fall back to the file name, which leads with the sequence
/// index.
pub fn chronological_frames(dir: &Path) -> Result<Vec<PathBuf>, AssemblyError> {
    let store_error = |source| AssemblyError::FrameStore {
        path: dir.to_path_buf(),
        source,
    };

    let mut frames: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(store_error)? {
        let entry = entry.map_err(store_error)?;
        let path = entry.path();
        if !is_frame_file(&path) {
            continue;
        }
        let metadata = entry.metadata().map_err(|source| AssemblyError::FrameStore {
            path: path.clone(),
            source,
        })?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata
            .modified()
            .map_err(|source| AssemblyError::FrameStore {
                path: path.clone(),
                source,
            })?;
        frames.push((modified, path));
    }

    frames.sort_by(|(a_time, a_path), (b_time, b_path)| {
        a_time
            .cmp(b_time)
            .then_with(|| a_path.file_name().cmp(&b_path.file_name()))
    });
    Ok(frames.into_iter().map(|(_, path)| path).collect())
}

/// Frames currently living under temporary names.
///
/// Dropping the guard renames whatever is still staged back.
struct StagedFrames {
    /// (temporary, original)
    renamed: Vec<(PathBuf, PathBuf)>,
}

impl StagedFrames {
    fn stage(dir: &Path, frames: &[PathBuf]) -> Result<Self, (AssemblyError, Vec<RestoreFailure>)> {
        let targets: Vec<PathBuf> = (0..frames.len())
            .map(|ordinal| dir.join(temp_file_name(ordinal)))
            .collect();
        if let Some(existing) = targets.iter().find(|t| t.symlink_metadata().is_ok()) {
            return Err((AssemblyError::TemporaryExists(existing.clone()), Vec::new()));
        }

        let mut staged = StagedFrames {
            renamed: Vec::with_capacity(frames.len()),
        };
        for (original, temporary) in frames.iter().zip(targets) {
            if let Err(source) = std::fs::rename(original, &temporary) {
                let error = AssemblyError::Stage {
                    from: original.clone(),
                    to: temporary,
                    source,
                };
                return Err((error, staged.restore()));
            }
            staged.renamed.push((temporary, original.clone()));
        }
        log::debug!("Staged {} frames under {}*", staged.renamed.len(), TEMP_PREFIX);
        Ok(staged)
    }

    fn restore(mut self) -> Vec<RestoreFailure> {
        self.restore_all()
    }

    fn restore_all(&mut self) -> Vec<RestoreFailure> {
        let mut failures = Vec::new();
        for (temporary, original) in self.renamed.drain(..) {
            if let Err(e) = std::fs::rename(&temporary, &original) {
                log::warn!(
                    "Could not restore {} to {}: {}",
                    temporary.display(),
                    original.display(),
                    e
                );
                failures.push(RestoreFailure {
                    temporary,
                    original,
                    message: e.to_string(),
                });
            }
        }
        failures
    }
}

impl Drop for StagedFrames {
    fn drop(&mut self) {
        if !self.renamed.is_empty() {
            self.restore_all();
        }
    }
}

/// Encode every frame in the job's directory into one video.
///
/// Frames are encoded in modification-time order. The frame store keeps its
/// original file names whatever the outcome; only the video is added on
/// success.
pub fn assemble<E: FrameEncoder + ?Sized>(job: &VideoJob, encoder: &E) -> AssemblyOutcome {
    if !encoder.is_available() {
        let manual_command = encoder.manual_command(job);
        log::warn!(
            "Encoder not available, skipping video assembly. Run later: {}",
            manual_command
        );
        return AssemblyOutcome::Skipped { manual_command };
    }

    let dir = job.source_dir();
    let frames = match chronological_frames(dir) {
        Ok(frames) if frames.is_empty() => {
            return AssemblyOutcome::failed(
                AssemblyError::NoFrames {
                    dir: dir.to_path_buf(),
                },
                Vec::new(),
            )
        }
        Ok(frames) => frames,
        Err(e) => return AssemblyOutcome::failed(e, Vec::new()),
    };

    let staged = match StagedFrames::stage(dir, &frames) {
        Ok(staged) => staged,
        Err((error, restore_failures)) => return AssemblyOutcome::failed(error, restore_failures),
    };

    let output = job.output_path();
    let output_existed = output.exists();
    let request = EncodeRequest::new(
        job,
        dir.join(format!("{TEMP_PREFIX}*.{FRAME_EXTENSION}")),
    );
    log::info!(
        "Encoding {} frames at {} fps into {}",
        frames.len(),
        job.fps(),
        output.display()
    );
    let result = encoder.encode(&request);

    let restore_failures = staged.restore();

    let error = match result {
        Ok(out) if out.success => {
            log::info!("Video written to {}", output.display());
            return AssemblyOutcome::Success {
                video: output,
                frames: frames.len(),
                restore_failures,
            };
        }
        Ok(out) => AssemblyError::EncoderInvocation {
            status: out
                .exit_code
                .map(|code| format!("status {code}"))
                .unwrap_or_else(|| "no status (terminated by signal)".to_string()),
            diagnostics: out.diagnostics.trim().to_string(),
        },
        Err(e) => AssemblyError::EncoderSpawn(e),
    };

    if !output_existed && output.exists() {
        if let Err(e) = std::fs::remove_file(&output) {
            log::warn!("Could not remove partial video {}: {}", output.display(), e);
        }
    }
    AssemblyOutcome::failed(error, restore_failures)
}
