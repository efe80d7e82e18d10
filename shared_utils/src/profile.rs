//! Encode profile ladder
//!
//! A profile fixes the three knobs of one re-encode attempt: output width,
//! temporal sampling rate and palette color count. The table is ordered from
//! highest quality to most aggressive; the ordering is hand-tuned and only
//! roughly correlated with output size, which is why the search layer never
//! assumes monotonicity.

use serde::{Deserialize, Serialize};

/// Temporal sampling for one profile. `Keep` leaves the source frame timing
/// untouched (no `fps` filter is inserted).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameRate {
    Keep,
    Fps(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub width: u32,
    pub rate: FrameRate,
    pub colors: u16,
}

impl Profile {
    pub const fn new(width: u32, rate: FrameRate, colors: u16) -> Self {
        Self {
            width,
            rate,
            colors,
        }
    }
}

/// Palette sizes for the stable-timing prefix profiles, highest first.
const KEEP_TIMING_COLORS: [u16; 3] = [256, 192, 160];

/// Build the ordered profile table for one request.
///
/// A non-empty custom table overrides everything. Otherwise the fixed ladder
/// is used; with `prefer_stable_timing` three keep-rate profiles at
/// `max_width` are prepended so frame timing is preserved before any
/// temporal resampling is attempted.
///
/// Always returns a non-empty table.
pub fn build_profile_table(
    max_width: u32,
    prefer_stable_timing: bool,
    custom: Option<&[Profile]>,
) -> Vec<Profile> {
    if let Some(table) = custom {
        if !table.is_empty() {
            return table.to_vec();
        }
    }

    let mut profiles = Vec::with_capacity(17);
    if prefer_stable_timing {
        for colors in KEEP_TIMING_COLORS {
            profiles.push(Profile::new(max_width, FrameRate::Keep, colors));
        }
    }

    profiles.extend_from_slice(&[
        Profile::new(max_width, FrameRate::Fps(18.0), 256),
        Profile::new(max_width, FrameRate::Fps(15.0), 256),
        Profile::new(max_width, FrameRate::Fps(12.0), 192),
        Profile::new(960, FrameRate::Fps(12.0), 192),
        Profile::new(832, FrameRate::Fps(10.0), 160),
        Profile::new(768, FrameRate::Fps(10.0), 128),
        Profile::new(640, FrameRate::Fps(8.0), 128),
        Profile::new(576, FrameRate::Fps(8.0), 96),
        Profile::new(512, FrameRate::Fps(8.0), 96),
        Profile::new(448, FrameRate::Fps(6.0), 80),
        Profile::new(384, FrameRate::Fps(5.0), 64),
        Profile::new(320, FrameRate::Fps(4.0), 64),
        Profile::new(256, FrameRate::Fps(4.0), 48),
        Profile::new(256, FrameRate::Fps(4.0), 32),
    ]);

    profiles
}
