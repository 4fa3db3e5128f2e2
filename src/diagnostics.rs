//! System diagnostics and dependency checking.
//!
//! Verifies that the tools the exporters lean on are installed and that
//! an audio output path exists.

use crate::export::video::encoder::{probe_format, SystemCommandExecutor, VideoFormat};
use crate::export::video::frame::load_system_font;
use std::process::Command;

/// Result of a dependency check.
#[derive(Debug, PartialEq)]
pub enum CheckResult {
    /// Tool is installed and working
    Ok,
    /// Tool is not found
    NotFound,
    /// Tool is found but has issues
    Warning(String),
}

/// Check if a command exists and is executable.
fn check_command(command: &str) -> CheckResult {
    match Command::new(command).arg("-version").output() {
        Ok(output) if output.status.success() => CheckResult::Ok,
        Ok(_) => CheckResult::Warning(format!("'{}' found but -version failed", command)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckResult::NotFound,
        Err(e) => CheckResult::Warning(format!("Error checking '{}': {}", command, e)),
    }
}

/// Probe which container ffmpeg on this machine can produce.
fn check_video_codecs() -> CheckResult {
    match probe_format(&SystemCommandExecutor::new()) {
        Ok(VideoFormat::Vp9Webm) => CheckResult::Ok,
        Ok(VideoFormat::H264Mp4) => {
            CheckResult::Warning("libvpx-vp9 missing; videos will be H.264 MP4".to_string())
        }
        Err(e) => CheckResult::Warning(e.to_string()),
    }
}

/// Check whether a system font is available for video captions.
fn check_fonts() -> CheckResult {
    if load_system_font().is_some() {
        CheckResult::Ok
    } else {
        CheckResult::NotFound
    }
}

/// Check whether an audio output device can be opened.
#[cfg(feature = "playback")]
fn check_audio_output() -> CheckResult {
    use cpal::traits::HostTrait;
    if cpal::default_host().default_output_device().is_some() {
        CheckResult::Ok
    } else {
        CheckResult::NotFound
    }
}

#[cfg(not(feature = "playback"))]
fn check_audio_output() -> CheckResult {
    CheckResult::Warning("built without the playback feature; audio is silent".to_string())
}

/// Run all dependency checks and print results.
pub fn check_dependencies() {
    println!("Checking system dependencies...\n");

    print!("ffmpeg (video export): ");
    match check_command("ffmpeg") {
        CheckResult::Ok => {
            println!("✓ OK");
            print!("  video codecs: ");
            match check_video_codecs() {
                CheckResult::Ok => println!("✓ VP9/WebM available"),
                CheckResult::Warning(msg) => println!("⚠ {}", msg),
                CheckResult::NotFound => println!("✗ NOT FOUND"),
            }
        }
        CheckResult::NotFound => {
            println!("✗ NOT FOUND");
            println!("  Install: sudo apt install ffmpeg  (Debian/Ubuntu)");
            println!("           sudo pacman -S ffmpeg    (Arch)");
            println!("  Storybook export still works without it.");
        }
        CheckResult::Warning(msg) => println!("⚠ WARNING: {}", msg),
    }

    print!("system font (video captions): ");
    match check_fonts() {
        CheckResult::Ok => println!("✓ OK"),
        CheckResult::NotFound => {
            println!("- none found");
            println!("  Install: sudo apt install fonts-dejavu-core");
            println!("  Videos render without captions until a font is present.");
        }
        CheckResult::Warning(msg) => println!("⚠ WARNING: {}", msg),
    }

    print!("audio output: ");
    match check_audio_output() {
        CheckResult::Ok => println!("✓ OK"),
        CheckResult::NotFound => {
            println!("- no output device");
            println!("  Narration and the ambient pad stay silent; exports still work.");
        }
        CheckResult::Warning(msg) => println!("⚠ {}", msg),
    }
}
