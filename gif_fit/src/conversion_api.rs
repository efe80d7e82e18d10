//! Compression orchestration
//!
//! One request runs the full pipeline: probe → constraint validation → skip
//! decision → duration retiming → profile table → size search → output.
//! Each request owns a private work directory for the encoder's intermediate
//! artifacts; it is removed (input artifact included) when the request
//! concludes, success or failure.

use serde::Serialize;
use shared_utils::errors::{GifFitError, Result};
use shared_utils::probe::{probe_bytes, refine_with_ffprobe, GifMeta};
use shared_utils::profile::{build_profile_table, Profile};
use shared_utils::retime::compute_retiming;
use shared_utils::size_search::{SizeConstraints, SizeSearcher};
use shared_utils::trial::FfmpegTrialRunner;
use shared_utils::{
    ensure_parent_dir_exists, human_bytes, preserve_file_times, require_ffmpeg,
    temp_path_for_output, BatchResult,
};
use std::path::{Path, PathBuf};
use tracing::{info, info_span, warn};

/// Run options beyond the search constraints.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub output_dir: Option<PathBuf>,
    pub force: bool,
    pub custom_profiles: Option<Vec<Profile>>,
}

/// The core envelope for one compressed request. `profile_index` is `None`
/// for pass-through (no re-encode was performed).
#[derive(Debug)]
pub struct CompressionOutcome {
    pub bytes: Vec<u8>,
    pub hit: bool,
    pub profile_index: Option<usize>,
}

/// Per-file summary for reporting. `profile_index` uses the wire sentinel:
/// `-1` means pass-through.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionSummary {
    pub input_path: String,
    pub output_path: Option<String>,
    pub input_size: u64,
    pub output_size: u64,
    pub hit: bool,
    pub profile_index: i64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_secs: Option<f64>,
    pub passthrough: bool,
    pub skipped: bool,
    pub message: String,
}

/// Which constraints the source violates: (size, width, duration).
fn violated_constraints(meta: &GifMeta, constraints: &SizeConstraints) -> (bool, bool, bool) {
    let need_size = meta.size > constraints.target_bytes;
    let need_scale = meta.width.is_some_and(|w| w > constraints.max_width);
    let need_duration = meta.duration_secs.is_some_and(|d| {
        d < constraints.min_duration - constraints.duration_epsilon
            || d > constraints.max_duration + constraints.duration_epsilon
    });
    (need_size, need_scale, need_duration)
}

/// Compress in-memory GIF bytes against the constraints.
///
/// The skip decision runs first: a source that already satisfies size,
/// width and duration is returned unmodified with `hit = true` and no
/// profile index. Otherwise the profile search runs; if every trial fails
/// the source is passed through with `hit = false` rather than erroring.
pub fn compress_bytes(
    source: Vec<u8>,
    meta: &GifMeta,
    constraints: &SizeConstraints,
    custom_profiles: Option<&[Profile]>,
) -> Result<CompressionOutcome> {
    constraints.validate()?;

    let (need_size, need_scale, need_duration) = violated_constraints(meta, constraints);
    if !need_size && !need_scale && !need_duration {
        info!("Source satisfies all constraints, passing through unmodified");
        return Ok(CompressionOutcome {
            bytes: source,
            hit: true,
            profile_index: None,
        });
    }

    require_ffmpeg()?;

    let retiming = compute_retiming(
        meta.duration_secs,
        constraints.min_duration,
        constraints.max_duration,
        constraints.duration_epsilon,
    );
    if let Some(r) = retiming {
        info!(factor = r.factor, "Retiming playback to fit the duration range");
    }

    // The stable-timing bias applies when only scaling or retiming is
    // needed; a size violation always goes straight to the resampling ladder.
    let prefer_keep = constraints.prefer_stable_timing && !need_size && (need_scale || need_duration);
    let table = build_profile_table(constraints.max_width, prefer_keep, custom_profiles);
    info!(
        profiles = table.len(),
        need_size, need_scale, need_duration, "Starting profile search"
    );

    let work_dir = tempfile::Builder::new()
        .prefix("gif_fit_")
        .tempdir()
        .map_err(GifFitError::IoError)?;
    let mut runner = FfmpegTrialRunner::new(work_dir.path(), &source, retiming, constraints.verbose)?;

    Ok(run_search(source, &table, constraints, &mut runner))
}

/// Run the search and map its report onto the request envelope. A report
/// with no surviving trial degrades to pass-through of the source.
fn run_search(
    source: Vec<u8>,
    table: &[Profile],
    constraints: &SizeConstraints,
    encoder: &mut dyn shared_utils::size_search::TrialEncoder,
) -> CompressionOutcome {
    let report = SizeSearcher::new(table, constraints).search(encoder);
    info!(trials = report.trials_run, hit = report.hit, "Search finished");

    match report.outcome {
        Some(outcome) => CompressionOutcome {
            hit: report.hit,
            profile_index: Some(outcome.profile_index),
            bytes: outcome.bytes,
        },
        None => {
            warn!("Every trial failed; returning the source unmodified");
            CompressionOutcome {
                bytes: source,
                hit: false,
                profile_index: None,
            }
        }
    }
}

/// Output path: `<stem>_compressed.gif` next to the input or under the
/// configured output directory.
pub fn determine_output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let file_name = format!("{}_compressed.gif", stem);
    match output_dir {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}

/// Compress one file on disk. Probing, compression and the atomic
/// temp-then-rename write all happen inside a per-request tracing span.
pub fn compress_file(
    input: &Path,
    constraints: &SizeConstraints,
    options: &ConvertOptions,
) -> Result<ConversionSummary> {
    let span = info_span!("compress", file = %input.display());
    let _guard = span.enter();

    let output_path = determine_output_path(input, options.output_dir.as_deref());
    if output_path.exists() && !options.force {
        info!(output = %output_path.display(), "Output exists, skipping (use --force to overwrite)");
        return Ok(ConversionSummary {
            input_path: input.display().to_string(),
            output_path: Some(output_path.display().to_string()),
            input_size: std::fs::metadata(input).map(|m| m.len()).unwrap_or(0),
            output_size: 0,
            hit: false,
            profile_index: -1,
            width: None,
            height: None,
            duration_secs: None,
            passthrough: false,
            skipped: true,
            message: "Skipped: output file exists".to_string(),
        });
    }

    let source = std::fs::read(input)
        .map_err(|e| GifFitError::InputReadError(format!("{}: {}", input.display(), e)))?;
    let mut meta = probe_bytes(&source);
    refine_with_ffprobe(&mut meta, input);
    info!(
        size = %human_bytes(meta.size),
        width = ?meta.width,
        duration = ?meta.duration_secs,
        frames = ?meta.frame_count,
        "Probed input"
    );

    let input_size = meta.size;
    let outcome = compress_bytes(source, &meta, constraints, options.custom_profiles.as_deref())?;
    let output_size = outcome.bytes.len() as u64;
    let passthrough = outcome.profile_index.is_none();

    ensure_parent_dir_exists(&output_path).map_err(|e| GifFitError::GeneralError(e.to_string()))?;
    let tmp_path = temp_path_for_output(&output_path);
    std::fs::write(&tmp_path, &outcome.bytes)?;
    std::fs::rename(&tmp_path, &output_path)?;
    if let Err(e) = preserve_file_times(input, &output_path) {
        warn!(error = %e, "Failed to preserve file times");
    }

    let message = if passthrough && outcome.hit {
        "Pass-through: already within constraints".to_string()
    } else if passthrough {
        "Pass-through: all encode trials failed".to_string()
    } else {
        format!(
            "{} -> {} (hit={}, ladder index {})",
            human_bytes(input_size),
            human_bytes(output_size),
            outcome.hit,
            outcome.profile_index.map(|i| i as i64).unwrap_or(-1)
        )
    };
    info!("{}", message);

    Ok(ConversionSummary {
        input_path: input.display().to_string(),
        output_path: Some(output_path.display().to_string()),
        input_size,
        output_size,
        hit: outcome.hit,
        profile_index: outcome.profile_index.map(|i| i as i64).unwrap_or(-1),
        width: meta.width,
        height: meta.height,
        duration_secs: meta.duration_secs,
        passthrough,
        skipped: false,
        message,
    })
}

/// Fold one file summary into the batch counters.
pub fn tally(result: &mut BatchResult, summary: &ConversionSummary) {
    if summary.skipped {
        result.skip();
    } else if summary.passthrough && summary.hit {
        result.pass_through(summary.input_size);
    } else if summary.hit {
        result.hit(summary.input_size, summary.output_size);
    } else {
        result.near_target(summary.input_size, summary.output_size);
    }
}
