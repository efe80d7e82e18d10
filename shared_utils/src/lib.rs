//! Shared utilities for gif-fit
//!
//! This crate carries everything below the CLI surface:
//! - the size-targeting profile search engine and its encoder seam
//! - the two-pass ffmpeg trial runner
//! - the encode profile ladder and duration retiming
//! - GIF metadata probing (structured parse with raster/ffprobe fallbacks)
//! - ffmpeg process driving, logging setup, batch collection helpers

pub mod batch;
pub mod common_utils;
pub mod errors;
pub mod ffmpeg_process;
pub mod logging;
pub mod probe;
pub mod profile;
pub mod retime;
pub mod size_search;
#[cfg(test)]
mod size_search_tests;
pub mod trial;

pub use batch::{collect_files, BatchResult, GIF_EXTENSIONS};
pub use common_utils::{
    ensure_dir_exists, ensure_parent_dir_exists, get_extension_lowercase, has_extension,
    human_bytes, mb_to_bytes, preserve_file_times, remove_file_safe, temp_path_for_output,
};
pub use errors::{GifFitError, Result};
pub use ffmpeg_process::{format_ffmpeg_error, is_ffmpeg_available, require_ffmpeg, run_ffmpeg};
pub use probe::{probe_bytes, probe_file, GifMeta};
pub use profile::{build_profile_table, FrameRate, Profile};
pub use retime::{compute_retiming, Retiming};
pub use size_search::{
    SearchReport, SizeConstraints, SizeSearcher, TrialEncoder, TrialOutcome,
};
pub use trial::FfmpegTrialRunner;
