//! GIF metadata probe
//!
//! Extracts width/height/duration/frame count from raw GIF bytes. Every
//! field is optional: a missing width disables the width-constraint check
//! downstream and a missing duration disables the duration check, so the
//! probe itself never fails on malformed input.
//!
//! Probe chain: structured GIF parse (dimensions + per-frame delays) →
//! raster decode for dimensions only → for files, an ffprobe pass as the
//! last resort.

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageDecoder};
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// Frame delay substituted when the GIF stores a zero delay, in milliseconds.
/// Browsers treat 0 as "as fast as possible"; 10ms matches the original
/// probing behavior.
const ZERO_DELAY_SUBSTITUTE_MS: f64 = 10.0;

#[derive(Debug, Clone, Default, Serialize)]
pub struct GifMeta {
    pub size: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_secs: Option<f64>,
    pub frame_count: Option<u64>,
}

/// Probe metadata from in-memory GIF bytes. Never errors; unknown fields
/// stay `None`.
pub fn probe_bytes(bytes: &[u8]) -> GifMeta {
    let mut meta = GifMeta {
        size: bytes.len() as u64,
        ..GifMeta::default()
    };

    match decode_animation(bytes) {
        Ok((width, height, duration_secs, frame_count)) => {
            meta.width = Some(width);
            meta.height = Some(height);
            meta.duration_secs = Some(duration_secs);
            meta.frame_count = Some(frame_count);
            return meta;
        }
        Err(e) => {
            debug!(error = %e, "Structured GIF parse failed, trying raster decode");
        }
    }

    // Dimensions-only fallback, mirroring the original raster-decode path.
    if let Ok(img) = image::load_from_memory(bytes) {
        meta.width = Some(img.width());
        meta.height = Some(img.height());
    } else {
        warn!("GIF metadata probe failed entirely; all fields unknown");
    }

    meta
}

fn decode_animation(bytes: &[u8]) -> image::ImageResult<(u32, u32, f64, u64)> {
    let decoder = GifDecoder::new(Cursor::new(bytes))?;
    let (width, height) = decoder.dimensions();
    let frames = decoder.into_frames().collect_frames()?;

    let total_ms: f64 = frames
        .iter()
        .map(|f| {
            let (numer, denom) = f.delay().numer_denom_ms();
            let ms = numer as f64 / denom.max(1) as f64;
            if ms > 0.0 {
                ms
            } else {
                ZERO_DELAY_SUBSTITUTE_MS
            }
        })
        .sum();

    Ok((width, height, total_ms / 1000.0, frames.len() as u64))
}

/// Probe a GIF file on disk. IO failure is the only error; parse failures
/// degrade field by field, finishing with an ffprobe pass for anything the
/// in-process decoders could not recover.
pub fn probe_file(path: &Path) -> crate::errors::Result<GifMeta> {
    let bytes = std::fs::read(path).map_err(|e| {
        crate::errors::GifFitError::InputReadError(format!("{}: {}", path.display(), e))
    })?;

    let mut meta = probe_bytes(&bytes);
    refine_with_ffprobe(&mut meta, path);
    Ok(meta)
}

/// Fill fields the in-process parse left unknown by asking ffprobe about the
/// on-disk file. No-op when nothing is missing or ffprobe cannot help.
pub fn refine_with_ffprobe(meta: &mut GifMeta, path: &Path) {
    if meta.width.is_some() && meta.duration_secs.is_some() {
        return;
    }
    if let Some(probed) = ffprobe_fallback(path) {
        meta.width = meta.width.or(probed.width);
        meta.height = meta.height.or(probed.height);
        meta.duration_secs = meta.duration_secs.or(probed.duration_secs);
        meta.frame_count = meta.frame_count.or(probed.frame_count);
    }
}

/// Ask ffprobe for the fields the in-process parse could not produce.
/// Best-effort: any failure just yields `None`.
fn ffprobe_fallback(path: &Path) -> Option<GifMeta> {
    let path_str = path.to_str()?;
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
            "--",
            path_str,
        ])
        .output()
        .ok()?;

    if !output.status.success() {
        debug!(path = %path.display(), "ffprobe fallback failed");
        return None;
    }

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).ok()?;

    let duration_secs = json["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok());

    let video_stream = json["streams"]
        .as_array()?
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("video"))?;

    let width = video_stream["width"].as_u64().map(|w| w as u32);
    let height = video_stream["height"].as_u64().map(|h| h as u32);
    let frame_count = video_stream["nb_frames"]
        .as_str()
        .and_then(|s| s.parse::<u64>().ok());

    Some(GifMeta {
        size: 0,
        width,
        height,
        duration_secs,
        frame_count,
    })
}
