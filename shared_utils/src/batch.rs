//! Batch collection module
//!
//! Gathers the GIF inputs for a run and tallies per-file outcomes for the
//! end-of-run summary.

use crate::common_utils::{has_extension, is_hidden_file};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const GIF_EXTENSIONS: &[&str] = &["gif"];

/// Collect regular files under `dir` matching `extensions`, skipping hidden
/// files. Non-recursive mode looks one level deep.
pub fn collect_files(dir: &Path, extensions: &[&str], recursive: bool) -> Vec<PathBuf> {
    let walker = if recursive {
        WalkDir::new(dir).follow_links(true)
    } else {
        WalkDir::new(dir).max_depth(1)
    };

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !is_hidden_file(e.path()))
        .filter(|e| has_extension(e.path(), extensions))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

/// Per-run outcome counters. `hits` counts results inside tolerance;
/// `passthrough` counts requests that needed no re-encode at all.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub total: usize,
    pub hits: usize,
    pub near: usize,
    pub passthrough: usize,
    pub skipped: usize,
    pub failed: usize,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub errors: Vec<(PathBuf, String)>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&mut self, input_bytes: u64, output_bytes: u64) {
        self.total += 1;
        self.hits += 1;
        self.input_bytes += input_bytes;
        self.output_bytes += output_bytes;
    }

    pub fn near_target(&mut self, input_bytes: u64, output_bytes: u64) {
        self.total += 1;
        self.near += 1;
        self.input_bytes += input_bytes;
        self.output_bytes += output_bytes;
    }

    pub fn pass_through(&mut self, bytes: u64) {
        self.total += 1;
        self.passthrough += 1;
        self.input_bytes += bytes;
        self.output_bytes += bytes;
    }

    pub fn skip(&mut self) {
        self.total += 1;
        self.skipped += 1;
    }

    pub fn fail(&mut self, path: PathBuf, error: String) {
        self.total += 1;
        self.failed += 1;
        self.errors.push((path, error));
    }

    pub fn merge(&mut self, other: BatchResult) {
        self.total += other.total;
        self.hits += other.hits;
        self.near += other.near;
        self.passthrough += other.passthrough;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.input_bytes += other.input_bytes;
        self.output_bytes += other.output_bytes;
        self.errors.extend(other.errors);
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            ((self.total - self.failed) as f64 / self.total as f64) * 100.0
        }
    }
}
