//! webtimelapse command line
//!
//! Usage:
//!     webtimelapse --url https://example.com --interval 60 --shots 30 --fullpage

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use webtimelapse::browser::WebDriverLauncher;
use webtimelapse::scheduler::{CaptureOutcome, Frame, TickObserver};
use webtimelapse::{
    run_timelapse, AssemblyOutcome, CancelToken, FfmpegEncoder, RunReport, TimelapseConfig,
    TimelapseError,
};

const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(
    name = "webtimelapse",
    version,
    about = "Capture a webpage at fixed intervals and assemble a timelapse video"
)]
struct Args {
    /// Page to capture
    #[arg(long)]
    url: Option<String>,

    /// Frame store directory [default: ./captures]
    #[arg(long)]
    out: Option<PathBuf>,

    /// Seconds between captures [default: 300]
    #[arg(long)]
    interval: Option<f64>,

    /// Number of captures
    #[arg(long, conflicts_with = "duration")]
    shots: Option<u32>,

    /// Total run time in seconds; captures = round(duration / interval)
    #[arg(long)]
    duration: Option<f64>,

    /// Viewport width [default: 1280]
    #[arg(long)]
    width: Option<u32>,

    /// Viewport height [default: 800]
    #[arg(long)]
    height: Option<u32>,

    /// Capture the full scrollable page
    #[arg(long)]
    fullpage: bool,

    /// Seconds to wait after each page load [default: 3.0]
    #[arg(long)]
    load_wait: Option<f64>,

    /// Video frame rate [default: 12]
    #[arg(long)]
    fps: Option<u32>,

    /// Video file name inside the output directory [default: timelapse.mp4]
    #[arg(long)]
    video: Option<String>,

    /// TOML configuration file [default: ./webtimelapse.toml if present]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use a running WebDriver server instead of spawning chromedriver
    #[arg(long, env = "WEBTIMELAPSE_WEBDRIVER_URL")]
    webdriver_url: Option<String>,

    /// chromedriver binary to spawn
    #[arg(long)]
    chromedriver: Option<PathBuf>,

    /// Seconds before a page load is abandoned [default: 120]
    #[arg(long)]
    page_load_timeout: Option<u64>,

    /// Only capture frames, do not assemble a video
    #[arg(long)]
    no_video: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    /// Flags win over the configuration file.
    fn apply(&self, config: &mut TimelapseConfig) {
        let capture = &mut config.capture;
        if let Some(url) = &self.url {
            capture.url = url.clone();
        }
        if let Some(out) = &self.out {
            capture.output_dir = out.clone();
        }
        if let Some(interval) = self.interval {
            capture.interval_secs = interval;
        }
        if let Some(shots) = self.shots {
            capture.shots = Some(shots);
            capture.duration_secs = None;
        }
        if let Some(duration) = self.duration {
            capture.duration_secs = Some(duration);
            capture.shots = None;
        }
        if let Some(width) = self.width {
            capture.width = width;
        }
        if let Some(height) = self.height {
            capture.height = height;
        }
        if self.fullpage {
            capture.full_page = true;
        }
        if let Some(load_wait) = self.load_wait {
            capture.load_wait_secs = load_wait;
        }

        if let Some(fps) = self.fps {
            config.video.fps = fps;
        }
        if let Some(video) = &self.video {
            config.video.file_name = video.clone();
        }
        if self.no_video {
            config.video.enabled = false;
        }

        if let Some(url) = &self.webdriver_url {
            config.browser.webdriver_url = Some(url.clone());
        }
        if let Some(path) = &self.chromedriver {
            config.browser.chromedriver = Some(path.clone());
        }
        if let Some(timeout) = self.page_load_timeout {
            config.browser.page_load_timeout_secs = timeout;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    webtimelapse::init_logging();
    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("[!] {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(TimelapseConfig::default_path);
    if args.config.is_some() && !config_path.exists() {
        anyhow::bail!("config file {} does not exist", config_path.display());
    }
    let mut config = TimelapseConfig::load_from_file(&config_path)?;
    args.apply(&mut config);
    let plan = config.plan()?;

    let output_dir = plan.session.output_dir().to_path_buf();
    std::fs::create_dir_all(&output_dir).map_err(|e| TimelapseError::io(&output_dir, e))?;

    if !args.json {
        print_header(&config, &plan.session);
    }

    let cancel = CancelToken::new();
    cancel
        .install_ctrlc_handler()
        .context("failed to install interrupt handler")?;

    let mut launcher = WebDriverLauncher::new()
        .with_startup_timeout(Duration::from_secs(config.browser.startup_timeout_secs));
    if let Some(endpoint) = &config.browser.webdriver_url {
        launcher = launcher.with_endpoint(endpoint.clone());
    }
    if let Some(path) = &config.browser.chromedriver {
        launcher = launcher.with_chromedriver(path.clone());
    }
    let encoder = FfmpegEncoder::with_program(config.video.ffmpeg.clone());

    let observer = (!args.json).then(progress_printer);
    let report = run_timelapse(plan, launcher, encoder, cancel, observer).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    if report.interrupted() {
        eprintln!("[!] Interrupted; browser session closed.");
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    Ok(ExitCode::SUCCESS)
}

fn print_header(config: &TimelapseConfig, session: &webtimelapse::Session) {
    println!("[*] Capturing {}", session.url());
    println!(
        "    {} shots, every {}s, viewport {}{}",
        session.ticks(),
        session.interval().as_secs_f64(),
        session.viewport(),
        if session.full_page() { ", full page" } else { "" }
    );
    println!("    Frames: {}", session.output_dir().display());
    if config.video.enabled {
        println!(
            "    Video:  {} at {} fps",
            session.output_dir().join(&config.video.file_name).display(),
            config.video.fps
        );
    }
}

fn progress_printer() -> TickObserver {
    Box::new(|frame: &Frame, total: u32| {
        let status = match &frame.outcome {
            CaptureOutcome::Success => "done.".to_string(),
            CaptureOutcome::Failed(reason) => format!("error: {reason}"),
        };
        println!(
            "[*] [{}/{}] Capturing {} ... {}",
            frame.sequence + 1,
            total,
            frame.file_name(),
            status
        );
    })
}

fn print_summary(report: &RunReport) {
    let capture = &report.capture;
    println!(
        "[*] Capture finished: {} succeeded, {} failed in {:.1}s",
        capture.succeeded(),
        capture.failed(),
        capture.elapsed.as_secs_f64()
    );
    if let Some(error) = &capture.release_error {
        eprintln!("[!] Browser session did not close cleanly: {}", error);
    }

    let Some(assembly) = &report.assembly else {
        return;
    };
    match assembly {
        AssemblyOutcome::Success { video, frames, .. } => {
            println!("[*] Video with {} frames written to {}", frames, video.display());
        }
        AssemblyOutcome::Skipped { manual_command } => {
            eprintln!("[!] ffmpeg not found, skipping video. Once installed, run:");
            eprintln!("    {}", manual_command);
        }
        AssemblyOutcome::Failed { error, .. } => {
            eprintln!("[!] Video assembly failed: {}", error);
        }
    }
    for failure in assembly.restore_failures() {
        eprintln!(
            "[!] Could not restore {} to {}: {}",
            failure.temporary.display(),
            failure.original.display(),
            failure.message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("webtimelapse").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_config() {
        let mut config = TimelapseConfig::default();
        config.capture.duration_secs = Some(600.0);
        config.video.fps = 30;

        parse(&["--url", "https://example.com", "--shots", "5", "--width", "800"])
            .apply(&mut config);
        assert_eq!(config.capture.url, "https://example.com");
        assert_eq!(config.capture.shots, Some(5));
        assert_eq!(config.capture.duration_secs, None);
        assert_eq!(config.capture.width, 800);
        assert_eq!(config.video.fps, 30);
    }

    #[test]
    fn shots_and_duration_conflict() {
        let result = Args::try_parse_from([
            "webtimelapse",
            "--url",
            "https://example.com",
            "--shots",
            "3",
            "--duration",
            "60",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn no_video_disables_assembly() {
        let mut config = TimelapseConfig::default();
        parse(&["--url", "https://example.com", "--shots", "1", "--no-video"]).apply(&mut config);
        assert!(config.plan().unwrap().video.is_none());
    }
}
