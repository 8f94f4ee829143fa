//! External encoder capability and the ffmpeg adapter

use super::config::VideoJob;
use crate::scheduler::{FRAME_EXTENSION, FRAME_PREFIX};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Input for one encoder invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeRequest {
    /// Glob matching the ordered input frames
    pub input_pattern: PathBuf,
    pub fps: u32,
    pub width: u32,
    pub output: PathBuf,
}

impl EncodeRequest {
    pub fn new(job: &VideoJob, input_pattern: impl Into<PathBuf>) -> Self {
        Self {
            input_pattern: input_pattern.into(),
            fps: job.fps(),
            width: job.width(),
            output: job.output_path(),
        }
    }
}

/// What the encoder process reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderOutput {
    pub success: bool,
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Captured stderr
    pub diagnostics: String,
}

/// A batch encoder turning an ordered image sequence into a video.
pub trait FrameEncoder {
    /// Whether the encoder can be invoked at all.
    fn is_available(&self) -> bool;

    /// Run the encoder to completion. `Err` means it could not be started.
    fn encode(&self, request: &EncodeRequest) -> std::io::Result<EncoderOutput>;

    /// Command an operator can run by hand once the encoder is installed.
    fn manual_command(&self, job: &VideoJob) -> String;
}

/// Scale to the target width keeping the aspect ratio, then pad the height
/// up to an even number (yuv420p needs even dimensions).
pub fn scale_filter(width: u32) -> String {
    format!("scale={width}:-1,pad={width}:ceil(ih/2)*2:0:0:black")
}

#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: PathBuf,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegEncoder {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
        }
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn resolve(&self) -> Option<PathBuf> {
        which::which(&self.program).ok()
    }

    pub fn arguments(request: &EncodeRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-y",
            "-framerate",
            &request.fps.to_string(),
            "-pattern_type",
            "glob",
            "-i",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(request.input_pattern.clone().into_os_string());
        args.extend(
            [
                "-vf",
                &scale_filter(request.width),
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
            ]
            .iter()
            .map(OsString::from),
        );
        args.push(request.output.clone().into_os_string());
        args
    }
}

impl FrameEncoder for FfmpegEncoder {
    fn is_available(&self) -> bool {
        self.resolve().is_some()
    }

    fn encode(&self, request: &EncodeRequest) -> std::io::Result<EncoderOutput> {
        let program = self.resolve().unwrap_or_else(|| self.program.clone());
        log::debug!(
            "Running {} with {} frames/s into {}",
            program.display(),
            request.fps,
            request.output.display()
        );

        let output = Command::new(&program)
            .args(Self::arguments(request))
            .stdin(Stdio::null())
            .output()?;

        Ok(EncoderOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            diagnostics: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn manual_command(&self, job: &VideoJob) -> String {
        let pattern = job
            .source_dir()
            .join(format!("{FRAME_PREFIX}*.{FRAME_EXTENSION}"));
        format!(
            "{} -framerate {} -pattern_type glob -i \"{}\" -vf \"{}\" -c:v libx264 -pix_fmt yuv420p \"{}\"",
            self.program.display(),
            job.fps(),
            pattern.display(),
            scale_filter(job.width()),
            job.output_path().display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> EncodeRequest {
        let job = VideoJob::new("/frames", 24, "out.mp4", 1280).unwrap();
        EncodeRequest::new(&job, "/frames/temp_*.png")
    }

    #[test]
    fn filter_pads_height_to_even() {
        assert_eq!(
            scale_filter(1280),
            "scale=1280:-1,pad=1280:ceil(ih/2)*2:0:0:black"
        );
    }

    #[test]
    fn arguments_follow_request() {
        let args: Vec<String> = FfmpegEncoder::arguments(&request())
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args[0], "-y");
        assert_eq!(args[1..3], ["-framerate", "24"]);
        assert_eq!(args[3..5], ["-pattern_type", "glob"]);
        assert_eq!(args[5..7], ["-i", "/frames/temp_*.png"]);
        assert!(args.contains(&scale_filter(1280)));
        assert_eq!(args.last().unwrap(), "/frames/out.mp4");
    }

    #[test]
    fn manual_command_uses_frame_glob() {
        let job = VideoJob::new("/frames", 12, "timelapse.mp4", 800).unwrap();
        let cmd = FfmpegEncoder::new().manual_command(&job);
        assert!(cmd.starts_with("ffmpeg -framerate 12"));
        assert!(cmd.contains("\"/frames/screenshot_*.png\""));
        assert!(cmd.contains("scale=800:-1"));
        assert!(cmd.ends_with("\"/frames/timelapse.mp4\""));
    }

    #[test]
    fn missing_program_is_unavailable() {
        let encoder = FfmpegEncoder::with_program("/nonexistent/webtimelapse/ffmpeg");
        assert!(!encoder.is_available());
        assert!(encoder.encode(&request()).is_err());
    }
}
