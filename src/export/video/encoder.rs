//! ffmpeg-backed video encoding with testable command execution.
//!
//! Codec selection probes `ffmpeg -encoders`: VP9 in WebM when libvpx-vp9
//! is available, H.264 in MP4 as the fallback. The `CommandExecutor`
//! trait keeps the probe testable without ffmpeg installed; the actual
//! encode streams raw RGB24 frames down a child process stdin.

use crate::error::{DreamQuestError, Result};
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

/// Trait for executing system commands.
///
/// Object-safe, Send + Sync for use in concurrent contexts.
/// Enables testability by allowing mock implementations.
pub trait CommandExecutor: Send + Sync {
    /// Execute a command with arguments.
    ///
    /// Returns the stdout of the command on success.
    /// Returns an error if the command fails or is not found.
    fn execute(&self, command: &str, args: &[&str]) -> Result<String>;
}

/// Production command executor using std::process::Command.
#[derive(Debug, Clone, Default)]
pub struct SystemCommandExecutor;

impl SystemCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for SystemCommandExecutor {
    fn execute(&self, command: &str, args: &[&str]) -> Result<String> {
        let output = Command::new(command).args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DreamQuestError::EncoderNotFound {
                    tool: command.to_string(),
                }
            } else {
                DreamQuestError::Render {
                    message: format!("Failed to execute {}: {}", command, e),
                }
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DreamQuestError::Render {
                message: format!(
                    "{} failed with status {:?}: {}",
                    command, output.status, stderr
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Video codec + container pairing chosen by the probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFormat {
    /// VP9 video, Opus audio, .webm container.
    Vp9Webm,
    /// H.264 video, AAC audio, .mp4 container.
    H264Mp4,
}

impl VideoFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            VideoFormat::Vp9Webm => "webm",
            VideoFormat::H264Mp4 => "mp4",
        }
    }

    fn video_codec(&self) -> &'static str {
        match self {
            VideoFormat::Vp9Webm => "libvpx-vp9",
            VideoFormat::H264Mp4 => "libx264",
        }
    }

    fn audio_codec(&self) -> &'static str {
        match self {
            VideoFormat::Vp9Webm => "libopus",
            VideoFormat::H264Mp4 => "aac",
        }
    }
}

/// Pick the best format ffmpeg on this machine can encode.
///
/// Prefers VP9/WebM, falls back to H.264/MP4, and errors if ffmpeg has
/// neither (or is missing entirely).
pub fn probe_format<E: CommandExecutor>(executor: &E) -> Result<VideoFormat> {
    let encoders = executor.execute("ffmpeg", &["-hide_banner", "-encoders"])?;
    if encoders.contains("libvpx-vp9") {
        Ok(VideoFormat::Vp9Webm)
    } else if encoders.contains("libx264") {
        Ok(VideoFormat::H264Mp4)
    } else {
        Err(DreamQuestError::Render {
            message: "ffmpeg has neither libvpx-vp9 nor libx264 available".to_string(),
        })
    }
}

/// A running ffmpeg child consuming raw RGB24 frames on stdin.
///
/// The audio track is read from a pre-rendered WAV file and transcoded
/// to the container's codec in the same pass.
pub struct FfmpegRecorder {
    child: Child,
    stdin: Option<ChildStdin>,
    /// Drains the child's stderr so a flood of encoder errors can never
    /// fill the pipe and stall `write_frame` mid-stream.
    stderr_reader: Option<JoinHandle<String>>,
}

/// Read the child's stderr to completion on its own thread.
fn drain_stderr(child: &mut Child) -> Option<JoinHandle<String>> {
    let mut stderr = child.stderr.take()?;
    Some(std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = stderr.read_to_string(&mut buf);
        buf
    }))
}

impl FfmpegRecorder {
    /// Spawn ffmpeg writing to `output`. `audio_wav` holds the complete
    /// soundtrack; its duration caps the output (`-shortest`).
    pub fn spawn(
        format: VideoFormat,
        width: u32,
        height: u32,
        fps: u32,
        audio_wav: &Path,
        output: &Path,
    ) -> Result<Self> {
        let size = format!("{}x{}", width, height);
        let fps_arg = fps.to_string();

        let mut child = Command::new("ffmpeg")
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-y",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgb24",
                "-s",
                &size,
                "-r",
                &fps_arg,
                "-i",
                "-",
            ])
            .arg("-i")
            .arg(audio_wav)
            .args([
                "-c:v",
                format.video_codec(),
                "-pix_fmt",
                "yuv420p",
                "-c:a",
                format.audio_codec(),
                "-shortest",
            ])
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DreamQuestError::EncoderNotFound {
                        tool: "ffmpeg".to_string(),
                    }
                } else {
                    DreamQuestError::Render {
                        message: format!("Failed to spawn ffmpeg: {}", e),
                    }
                }
            })?;

        let stdin = child.stdin.take();
        let stderr_reader = drain_stderr(&mut child);
        Ok(Self {
            child,
            stdin,
            stderr_reader,
        })
    }

    /// Feed one raw RGB24 frame.
    pub fn write_frame(&mut self, rgb: &[u8]) -> Result<()> {
        let stdin = self.stdin.as_mut().ok_or_else(|| DreamQuestError::Render {
            message: "ffmpeg stdin already closed".to_string(),
        })?;
        stdin.write_all(rgb).map_err(|e| DreamQuestError::Render {
            message: format!("ffmpeg stopped accepting frames: {}", e),
        })
    }

    /// Close stdin and wait for ffmpeg to finish the container.
    pub fn finish(mut self) -> Result<()> {
        // Dropping stdin sends EOF
        drop(self.stdin.take());

        let status = self.child.wait().map_err(|e| DreamQuestError::Render {
            message: format!("Failed to wait for ffmpeg: {}", e),
        })?;
        let stderr = self
            .stderr_reader
            .take()
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(DreamQuestError::Render {
                message: format!("ffmpeg exited with {:?}: {}", status, stderr.trim()),
            });
        }
        Ok(())
    }
}

impl Drop for FfmpegRecorder {
    fn drop(&mut self) {
        // Abandoned mid-render: kill rather than leak the child
        if self.stdin.is_some() {
            drop(self.stdin.take());
            let _ = self.child.kill();
            let _ = self.child.wait();
            if let Some(reader) = self.stderr_reader.take() {
                let _ = reader.join();
            }
        }
    }
}
