//! Two-pass GIF trial encoder
//!
//! One trial runs the external encoder twice against the request's input
//! artifact: pass one derives a constrained palette from the (optionally
//! retimed, optionally resampled, width-capped) stream, pass two re-encodes
//! against that palette with a fixed dithering strategy.
//!
//! Intermediate artifacts are named by trial index inside the request's
//! private work directory and removed on every exit path — the work
//! directory is a shared, size-bounded resource across the trials of one
//! request.

use crate::common_utils::remove_file_safe;
use crate::errors::Result;
use crate::ffmpeg_process::run_ffmpeg;
use crate::profile::{FrameRate, Profile};
use crate::retime::Retiming;
use crate::size_search::TrialEncoder;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Removes both intermediates when the trial scope ends, success or failure.
struct TrialArtifacts {
    palette: PathBuf,
    trial: PathBuf,
}

impl Drop for TrialArtifacts {
    fn drop(&mut self) {
        remove_file_safe(&self.palette);
        remove_file_safe(&self.trial);
    }
}

/// Build the two filter descriptions for one profile.
///
/// `prefix` is the shared per-request transform (the `setpts` retiming),
/// already terminated with a comma when present.
fn build_filters(profile: &Profile, prefix: &str) -> (String, String) {
    let fps_fragment = match profile.rate {
        FrameRate::Keep => String::new(),
        FrameRate::Fps(fps) => format!("fps={},", fps),
    };
    let scale = format!("scale=min(iw\\,{}):-1:flags=lanczos", profile.width);

    let palette_filter = format!(
        "{}{}{},palettegen=max_colors={}:stats_mode=diff:reserve_transparent=1",
        prefix, fps_fragment, scale, profile.colors
    );
    let use_filter = format!(
        "[0:v]{}{}{}[x];[x][1:v]paletteuse=dither=bayer:bayer_scale=5:diff_mode=rectangle",
        prefix, fps_fragment, scale
    );

    (palette_filter, use_filter)
}

/// Drives ffmpeg for the trials of a single request.
///
/// The input artifact is written once at construction; the orchestrating
/// context owns the work directory and removes it (input included) after
/// the request concludes.
pub struct FfmpegTrialRunner {
    work_dir: PathBuf,
    input_path: PathBuf,
    /// Shared transform prefix prepended to every trial's filter chain,
    /// comma-terminated or empty. Fixed for the request lifetime.
    transform_prefix: String,
    verbose: bool,
}

impl FfmpegTrialRunner {
    pub fn new(
        work_dir: &Path,
        source_bytes: &[u8],
        retiming: Option<Retiming>,
        verbose: bool,
    ) -> Result<Self> {
        let input_path = work_dir.join("in.gif");
        std::fs::write(&input_path, source_bytes)?;

        let transform_prefix = retiming
            .map(|r| format!("{},", r.setpts_filter()))
            .unwrap_or_default();

        Ok(Self {
            work_dir: work_dir.to_path_buf(),
            input_path,
            transform_prefix,
            verbose,
        })
    }

    fn verbosity(&self) -> &'static str {
        if self.verbose {
            "info"
        } else {
            "error"
        }
    }
}

impl TrialEncoder for FfmpegTrialRunner {
    fn encode_trial(&mut self, profile_index: usize, profile: &Profile) -> Result<Vec<u8>> {
        let artifacts = TrialArtifacts {
            palette: self.work_dir.join(format!("palette_{}.png", profile_index)),
            trial: self.work_dir.join(format!("trial_{}.gif", profile_index)),
        };

        let (palette_filter, use_filter) = build_filters(profile, &self.transform_prefix);
        debug!(
            index = profile_index,
            width = profile.width,
            colors = profile.colors,
            filter = %palette_filter,
            "Starting trial"
        );

        let input = self.input_path.to_string_lossy().into_owned();
        let palette = artifacts.palette.to_string_lossy().into_owned();
        let trial = artifacts.trial.to_string_lossy().into_owned();

        let palette_args: Vec<String> = vec![
            "-y".into(),
            "-v".into(),
            self.verbosity().into(),
            "-i".into(),
            input.clone(),
            "-vf".into(),
            palette_filter,
            palette.clone(),
        ];
        run_ffmpeg(&palette_args)?;

        let encode_args: Vec<String> = vec![
            "-y".into(),
            "-v".into(),
            self.verbosity().into(),
            "-i".into(),
            input,
            "-i".into(),
            palette,
            "-filter_complex".into(),
            use_filter,
            "-loop".into(),
            "0".into(),
            trial,
        ];
        run_ffmpeg(&encode_args)?;

        let bytes = std::fs::read(&artifacts.trial)?;
        Ok(bytes)
        // artifacts dropped here: palette and trial removed on every path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(width: u32, rate: FrameRate, colors: u16) -> Profile {
        Profile {
            width,
            rate,
            colors,
        }
    }

    #[test]
    fn test_build_filters_with_fps() {
        let (palette, use_f) = build_filters(&profile(640, FrameRate::Fps(8.0), 128), "");
        assert_eq!(
            palette,
            "fps=8,scale=min(iw\\,640):-1:flags=lanczos,palettegen=max_colors=128:stats_mode=diff:reserve_transparent=1"
        );
        assert_eq!(
            use_f,
            "[0:v]fps=8,scale=min(iw\\,640):-1:flags=lanczos[x];[x][1:v]paletteuse=dither=bayer:bayer_scale=5:diff_mode=rectangle"
        );
    }

    #[test]
    fn test_build_filters_keep_rate_omits_fps() {
        let (palette, use_f) = build_filters(&profile(1024, FrameRate::Keep, 256), "");
        assert!(!palette.contains("fps="));
        assert!(!use_f.contains("fps="));
        assert!(palette.contains("max_colors=256"));
    }

    #[test]
    fn test_build_filters_with_retiming_prefix() {
        let (palette, use_f) = build_filters(
            &profile(512, FrameRate::Fps(12.0), 96),
            "setpts=0.666667*PTS,",
        );
        assert!(palette.starts_with("setpts=0.666667*PTS,fps=12,"));
        assert!(use_f.starts_with("[0:v]setpts=0.666667*PTS,fps=12,"));
    }

    #[test]
    fn test_fractional_fps_formatting() {
        let (palette, _) = build_filters(&profile(512, FrameRate::Fps(12.5), 96), "");
        assert!(palette.contains("fps=12.5,"));
    }

    #[test]
    fn test_runner_writes_input_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FfmpegTrialRunner::new(dir.path(), b"GIF89a-ish", None, false).unwrap();
        assert!(runner.input_path.exists());
        assert_eq!(std::fs::read(&runner.input_path).unwrap(), b"GIF89a-ish");
    }

    #[test]
    fn test_artifact_names_are_per_trial_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = TrialArtifacts {
            palette: dir.path().join("palette_0.png"),
            trial: dir.path().join("trial_0.gif"),
        };
        let b = TrialArtifacts {
            palette: dir.path().join("palette_7.png"),
            trial: dir.path().join("trial_7.gif"),
        };
        assert_ne!(a.palette, b.palette);
        assert_ne!(a.trial, b.trial);
    }

    #[test]
    fn test_artifacts_guard_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let palette = dir.path().join("palette_1.png");
        let trial = dir.path().join("trial_1.gif");
        std::fs::write(&palette, b"p").unwrap();
        std::fs::write(&trial, b"t").unwrap();
        {
            let _guard = TrialArtifacts {
                palette: palette.clone(),
                trial: trial.clone(),
            };
        }
        assert!(!palette.exists());
        assert!(!trial.exists());
    }
}
