//! gif-fit - Size-budget GIF compression API
//!
//! Compresses animated GIFs to satisfy a byte budget (with tolerance), an
//! optional maximum width and an acceptable duration range, by searching an
//! ordered ladder of palette re-encode profiles against an external ffmpeg.
//!
//! ## Library use
//! ```rust,ignore
//! use gif_fit::{compress_file, ConvertOptions};
//! use gif_fit::presets::Preset;
//! use std::path::Path;
//!
//! let constraints = Preset::wechat_default().constraints();
//! let summary = compress_file(Path::new("sticker.gif"), &constraints, &ConvertOptions::default())?;
//! println!("hit={} index={}", summary.hit, summary.profile_index);
//! ```

pub mod conversion_api;
pub mod presets;
pub mod report;

// Re-exports
pub use conversion_api::{
    compress_bytes, compress_file, determine_output_path, tally, CompressionOutcome,
    ConversionSummary, ConvertOptions,
};
pub use presets::{Preset, PresetStore, DEFAULT_PRESET_ID};

// Shared types surface
pub use shared_utils::errors::{GifFitError, Result};
pub use shared_utils::probe::{probe_bytes, probe_file, GifMeta};
pub use shared_utils::profile::{build_profile_table, FrameRate, Profile};
pub use shared_utils::size_search::SizeConstraints;
