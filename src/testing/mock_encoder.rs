use crate::assembly::{EncodeRequest, EncoderOutput, FrameEncoder, VideoJob, TEMP_PREFIX};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// One recorded `encode` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeCall {
    pub fps: u32,
    pub width: u32,
    pub output: PathBuf,
    /// Staged inputs in name order, with their contents at encode time
    pub inputs: Vec<(String, Vec<u8>)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Succeed,
    /// Exit non-zero after writing a partial output file
    Fail,
    /// Refuse to start
    SpawnError,
}

/// Encoder stand-in that snapshots the staged frames instead of encoding them.
#[derive(Debug, Clone)]
pub struct MockEncoder {
    available: bool,
    behavior: Behavior,
    calls: Arc<Mutex<Vec<EncodeCall>>>,
}

impl MockEncoder {
    fn with(available: bool, behavior: Behavior) -> Self {
        Self {
            available,
            behavior,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn available() -> Self {
        Self::with(true, Behavior::Succeed)
    }

    pub fn unavailable() -> Self {
        Self::with(false, Behavior::Succeed)
    }

    pub fn failing() -> Self {
        Self::with(true, Behavior::Fail)
    }

    pub fn unspawnable() -> Self {
        Self::with(true, Behavior::SpawnError)
    }

    pub fn calls(&self) -> Vec<EncodeCall> {
        self.calls.lock().expect("mock encoder lock poisoned").clone()
    }

    fn staged_inputs(request: &EncodeRequest) -> io::Result<Vec<(String, Vec<u8>)>> {
        let Some(dir) = request.input_pattern.parent() else {
            return Ok(Vec::new());
        };
        let mut inputs = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(TEMP_PREFIX) {
                inputs.push((name, std::fs::read(entry.path())?));
            }
        }
        inputs.sort();
        Ok(inputs)
    }
}

impl FrameEncoder for MockEncoder {
    fn is_available(&self) -> bool {
        self.available
    }

    fn encode(&self, request: &EncodeRequest) -> io::Result<EncoderOutput> {
        if self.behavior == Behavior::SpawnError {
            return Err(io::Error::new(io::ErrorKind::NotFound, "mock encoder missing"));
        }

        let inputs = Self::staged_inputs(request)?;
        self.calls
            .lock()
            .expect("mock encoder lock poisoned")
            .push(EncodeCall {
                fps: request.fps,
                width: request.width,
                output: request.output.clone(),
                inputs,
            });

        match self.behavior {
            Behavior::Succeed => {
                std::fs::write(&request.output, b"mock video")?;
                Ok(EncoderOutput {
                    success: true,
                    exit_code: Some(0),
                    diagnostics: String::new(),
                })
            }
            _ => {
                std::fs::write(&request.output, b"partial")?;
                Ok(EncoderOutput {
                    success: false,
                    exit_code: Some(1),
                    diagnostics: "mock encoder: invalid input\n".to_string(),
                })
            }
        }
    }

    fn manual_command(&self, job: &VideoJob) -> String {
        format!("mock-encode {}", job.output_path().display())
    }
}
