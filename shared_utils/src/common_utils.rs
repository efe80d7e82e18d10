//! Common Utilities Module
//!
//! Small helpers shared across the workspace: extension checks, byte
//! formatting, and file hygiene around the conversion outputs.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Lowercased file extension, empty string when there is none.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::get_extension_lowercase;
///
/// assert_eq!(get_extension_lowercase(Path::new("anim.GIF")), "gif");
/// assert_eq!(get_extension_lowercase(Path::new("noext")), "");
/// ```
pub fn get_extension_lowercase(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// Case-insensitive extension membership test.
///
/// # Examples
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::has_extension;
///
/// assert!(has_extension(Path::new("sticker.GIF"), &["gif"]));
/// assert!(!has_extension(Path::new("video.mp4"), &["gif"]));
/// ```
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    let ext = get_extension_lowercase(path);
    extensions.contains(&ext.as_str())
}

/// Hidden files (dot-prefixed) are skipped during collection.
pub fn is_hidden_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

/// Create a directory and all parents, erroring with the path in context.
pub fn ensure_dir_exists(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
}

/// Create the parent directory of a file path if it has one.
pub fn ensure_parent_dir_exists(file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        ensure_dir_exists(parent)?;
    }
    Ok(())
}

/// Human-readable byte count: `123B`, `1.20KB`, `9.00MB`.
///
/// # Examples
/// ```
/// use shared_utils::common_utils::human_bytes;
///
/// assert_eq!(human_bytes(512), "512B");
/// assert_eq!(human_bytes(2048), "2.00KB");
/// assert_eq!(human_bytes(9 * 1024 * 1024), "9.00MB");
/// ```
pub fn human_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{}B", bytes)
    } else if bytes < MB {
        format!("{:.2}KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.2}MB", bytes as f64 / MB as f64)
    }
}

/// Convert a megabyte quantity from the CLI/preset surface into bytes.
pub fn mb_to_bytes(mb: f64) -> u64 {
    (mb * 1024.0 * 1024.0).round().max(0.0) as u64
}

/// Remove a file, ignoring "not found"; other failures are logged and ignored.
///
/// Trial artifacts are cleaned up on every exit path, so double removal is
/// expected and must stay silent.
pub fn remove_file_safe(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove intermediate file");
        }
    }
}

/// Carry the source file's timestamps over to the output.
///
/// Only atime and mtime are preserved, which is what downstream sync tools
/// key on.
pub fn preserve_file_times(source: &Path, target: &Path) -> Result<()> {
    let meta = std::fs::metadata(source)
        .with_context(|| format!("Failed to stat source: {}", source.display()))?;
    let atime = filetime::FileTime::from_last_access_time(&meta);
    let mtime = filetime::FileTime::from_last_modification_time(&meta);
    filetime::set_file_times(target, atime, mtime)
        .with_context(|| format!("Failed to set file times: {}", target.display()))
}

/// Sibling path used while an output is being written, renamed into place on
/// success so a crashed run never leaves a half-written `.gif` behind.
pub fn temp_path_for_output(output: &Path) -> PathBuf {
    let file_name = output
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("output");
    output.with_file_name(format!(".{}.tmp", file_name))
}
