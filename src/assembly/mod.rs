//! Frame assembly
//!
//! Turns the frames a capture run left behind into one video. Frames are
//! ordered by modification time, staged under dense `temp_NNNNNN.png` names
//! for the encoder, and always renamed back afterwards.

pub mod config;
pub mod encoder;
pub mod pipeline;

pub use config::{VideoJob, DEFAULT_FPS, DEFAULT_VIDEO_NAME};
pub use encoder::{scale_filter, EncodeRequest, EncoderOutput, FfmpegEncoder, FrameEncoder};
pub use pipeline::{
    assemble, chronological_frames, temp_file_name, AssemblyError, AssemblyOutcome,
    RestoreFailure, TEMP_PREFIX,
};
