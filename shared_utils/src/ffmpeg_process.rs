//! FFmpeg process module
//!
//! All encoder invocations go through `run_ffmpeg`, which logs the full
//! command line, captures both output streams and turns a nonzero exit into
//! a typed error carrying the most meaningful stderr line.
//!
//! Availability of the `ffmpeg` binary is resolved once per process; a
//! missing encoder is the fatal initialization error of the whole run, as
//! opposed to per-trial encode failures which are recoverable.

use crate::errors::{GifFitError, Result};
use lazy_static::lazy_static;
use std::path::PathBuf;
use std::process::{Command, Output};
use tracing::{debug, error, info};

lazy_static! {
    static ref FFMPEG_PATH: Option<PathBuf> = which::which("ffmpeg").ok();
}

/// True when an `ffmpeg` binary was found on PATH at first use.
pub fn is_ffmpeg_available() -> bool {
    FFMPEG_PATH.is_some()
}

/// Fail fast before the first request when the encoder is missing.
pub fn require_ffmpeg() -> Result<()> {
    if is_ffmpeg_available() {
        Ok(())
    } else {
        Err(GifFitError::ToolNotFound(
            "ffmpeg not found on PATH. Install with: brew install ffmpeg".to_string(),
        ))
    }
}

/// Run ffmpeg with the given arguments, capturing stdout/stderr.
///
/// A spawn failure or nonzero exit code becomes `GifFitError::FFmpegError`;
/// callers decide whether that is fatal (initialization) or a recoverable
/// per-trial failure.
pub fn run_ffmpeg(args: &[String]) -> Result<Output> {
    let ffmpeg = FFMPEG_PATH
        .as_ref()
        .ok_or_else(|| GifFitError::ToolNotFound("ffmpeg not found on PATH".to_string()))?;

    let command_str = format!("ffmpeg {}", args.join(" "));
    info!(command = %command_str, "Executing FFmpeg command");

    let start = std::time::Instant::now();
    let output = Command::new(ffmpeg)
        .args(args)
        .output()
        .map_err(|e| GifFitError::FFmpegError(format!("Failed to spawn ffmpeg: {}", e)))?;
    let elapsed = start.elapsed();

    if output.status.success() {
        info!(
            exit_code = output.status.code(),
            duration_secs = elapsed.as_secs_f64(),
            "FFmpeg command completed successfully"
        );
        debug!(
            stdout_length = output.stdout.len(),
            stderr_length = output.stderr.len(),
            "FFmpeg output captured"
        );
        Ok(output)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        error!(
            command = %command_str,
            exit_code = ?output.status.code(),
            stderr = %stderr,
            duration_secs = elapsed.as_secs_f64(),
            "FFmpeg command failed"
        );
        Err(GifFitError::FFmpegError(format_ffmpeg_error(&stderr)))
    }
}

/// Extract the most meaningful error line from ffmpeg stderr.
///
/// Prefers the last line containing "Error"/"error", then the last line that
/// is not a progress line, then a generic fallback.
pub fn format_ffmpeg_error(stderr: &str) -> String {
    if let Some(error_line) = stderr
        .lines()
        .rev()
        .find(|line| line.contains("Error") || line.contains("error"))
    {
        return error_line.trim().to_string();
    }

    stderr
        .lines()
        .rev()
        .find(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty()
                && !trimmed.starts_with("frame=")
                && !trimmed.starts_with("fps=")
                && !trimmed.starts_with("size=")
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "Unknown FFmpeg error".to_string())
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_format_error_non_empty(content in "[a-zA-Z0-9 ]{1,100}") {
            let error = format_ffmpeg_error(&content);
            prop_assert!(!error.is_empty());
        }

        #[test]
        fn prop_format_error_prefers_error_line(
            prefix in "[a-zA-Z ]{0,50}",
            suffix in "[a-zA-Z ]{0,50}"
        ) {
            let stderr = format!("{}\nError: test error message\n{}", prefix, suffix);
            let error = format_ffmpeg_error(&stderr);
            prop_assert!(error.contains("Error"), "Should contain 'Error', got: {}", error);
        }
    }
}
