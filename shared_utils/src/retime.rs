//! Duration retiming
//!
//! When the source animation's duration falls outside the accepted range,
//! playback is sped up or slowed down by scaling presentation timestamps.
//! The factor is computed once per request and prepended to every trial's
//! filter chain; it is never recomputed between trials.

/// Denominator floor when the source duration rounds to zero.
const MIN_POSITIVE_DURATION: f64 = 0.001;

/// A fixed playback-rate multiplier for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Retiming {
    pub factor: f64,
}

impl Retiming {
    /// The `setpts` filter fragment applied before scaling/resampling.
    pub fn setpts_filter(&self) -> String {
        format!("setpts={:.6}*PTS", self.factor)
    }
}

/// Compute the retiming factor for a source duration against the accepted
/// range `[min_duration, max_duration]`, widened by `epsilon` on both sides.
///
/// Returns `None` when the duration is unknown or already acceptable. The
/// target duration is the source clamped into the range; division by zero is
/// guarded by substituting the target itself, then a minimal positive
/// duration.
pub fn compute_retiming(
    source_duration: Option<f64>,
    min_duration: f64,
    max_duration: f64,
    epsilon: f64,
) -> Option<Retiming> {
    let duration = source_duration?;

    let out_of_range =
        duration < min_duration - epsilon || duration > max_duration + epsilon;
    if !out_of_range {
        return None;
    }

    let target = duration.clamp(min_duration, max_duration);
    let denominator = if duration > 0.0 {
        duration
    } else if target > 0.0 {
        target
    } else {
        MIN_POSITIVE_DURATION
    };

    Some(Retiming {
        factor: target / denominator,
    })
}
