use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::error::{GlowgridError, GlowgridResult};

/// File name for frame `idx` in the sequence handed to the encoder.
pub fn frame_file_name(idx: u64) -> String {
    format!("frame_{idx:06}.png")
}

/// ffmpeg-style pattern matching `frame_file_name`.
pub const FRAME_PATTERN: &str = "frame_%06d.png";

/// Reports the duration of an audio file in seconds.
///
/// A trait so tests can substitute a deterministic fake for the external
/// tool.
pub trait DurationProbe {
    fn probe(&self, audio: &Path) -> GlowgridResult<f64>;
}

/// Turns a numbered frame sequence into a silent video, and muxes it with an
/// audio track into the final container.
pub trait Encoder {
    fn encode_frames(&self, frames_dir: &Path, fps: u32, out: &Path) -> GlowgridResult<()>;
    fn mux(&self, video: &Path, audio: &Path, out: &Path) -> GlowgridResult<()>;
}

/// `ffprobe`-backed probe. The binary can be overridden with `FFPROBE_BIN`.
pub struct FfprobeDurationProbe {
    bin: PathBuf,
}

impl FfprobeDurationProbe {
    pub fn from_env() -> Self {
        let bin = std::env::var("FFPROBE_BIN").unwrap_or_else(|_| "ffprobe".to_string());
        Self {
            bin: PathBuf::from(bin),
        }
    }
}

impl DurationProbe for FfprobeDurationProbe {
    fn probe(&self, audio: &Path) -> GlowgridResult<f64> {
        let mut cmd = Command::new(&self.bin);
        cmd.args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=nk=1:nw=1",
        ])
        .arg(audio);
        let output = run_checked("ffprobe", &mut cmd)?;
        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

fn parse_duration(stdout: &str) -> GlowgridResult<f64> {
    stdout.trim().parse::<f64>().map_err(|_| {
        GlowgridError::encode(format!(
            "unable to parse ffprobe duration output: '{}'",
            stdout.trim()
        ))
    })
}

/// `ffmpeg`-backed encoder/muxer. The binary can be overridden with
/// `FFMPEG_BIN`.
///
/// We use the system binary rather than linking FFmpeg to avoid native dev
/// header/lib requirements.
pub struct FfmpegEncoder {
    bin: PathBuf,
}

impl FfmpegEncoder {
    pub fn from_env() -> Self {
        let bin = std::env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string());
        Self {
            bin: PathBuf::from(bin),
        }
    }
}

impl Encoder for FfmpegEncoder {
    fn encode_frames(&self, frames_dir: &Path, fps: u32, out: &Path) -> GlowgridResult<()> {
        let mut cmd = Command::new(&self.bin);
        cmd.args(["-y", "-hide_banner", "-loglevel", "error", "-framerate"])
            .arg(fps.to_string())
            .arg("-i")
            .arg(frames_dir.join(FRAME_PATTERN))
            .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
            .arg(out);
        run_checked("ffmpeg encode", &mut cmd)?;
        Ok(())
    }

    fn mux(&self, video: &Path, audio: &Path, out: &Path) -> GlowgridResult<()> {
        let mut cmd = Command::new(&self.bin);
        cmd.args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
            .arg(video)
            .arg("-i")
            .arg(audio)
            // Copy the silent video stream, re-encode audio, trim to the
            // shorter of the two.
            .args(["-c:v", "copy", "-c:a", "aac", "-b:a", "192k", "-shortest"])
            .arg(out);
        run_checked("ffmpeg mux", &mut cmd)?;
        Ok(())
    }
}

/// Run an external tool to completion; a non-zero exit is terminal and
/// surfaces the captured stderr.
fn run_checked(label: &str, cmd: &mut Command) -> GlowgridResult<Output> {
    let output = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            GlowgridError::encode(format!(
                "failed to spawn {label} (is it installed and on PATH?): {e}"
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GlowgridError::encode(format!(
            "{label} exited with status {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_names_are_zero_padded() {
        assert_eq!(frame_file_name(0), "frame_000000.png");
        assert_eq!(frame_file_name(69), "frame_000069.png");
        assert_eq!(frame_file_name(123_456), "frame_123456.png");
    }

    #[test]
    fn parse_duration_accepts_float_output() {
        assert_eq!(parse_duration("2.33\n").unwrap(), 2.33);
        assert_eq!(parse_duration(" 140.016000 ").unwrap(), 140.016);
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert!(parse_duration("N/A").is_err());
        assert!(parse_duration("").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn run_checked_surfaces_exit_code_and_stderr() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo boom >&2; exit 3"]);
        let err = run_checked("tool", &mut cmd).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("tool exited"));
        assert!(msg.contains("boom"));
    }

    #[cfg(unix)]
    #[test]
    fn run_checked_passes_through_success() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "printf 1.5"]);
        let output = run_checked("tool", &mut cmd).unwrap();
        assert_eq!(parse_duration(&String::from_utf8_lossy(&output.stdout)).unwrap(), 1.5);
    }

    #[test]
    fn missing_binary_is_an_encode_error() {
        let mut cmd = Command::new("definitely-not-a-real-binary-glowgrid");
        let err = run_checked("tool", &mut cmd).unwrap_err();
        assert!(matches!(err, GlowgridError::Encode(_)));
    }
}
