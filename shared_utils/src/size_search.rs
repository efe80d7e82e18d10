//! Size-targeting profile search engine
//!
//! Given an ordered profile table, the searcher probes the boundaries first
//! (cheap detection of easy hits at either end), then binary-searches the
//! interior. The ladder is ordered by *expected* output size only — it is
//! not proven monotone — so the bracket is moved by the observed sign of
//! each trial and a hard iteration cap bounds the loop against oscillation.
//! A best-seen candidate is tracked across all trials; the search never
//! returns empty-handed while at least one trial succeeded.

use crate::errors::{GifFitError, Result};
use crate::profile::Profile;
use tracing::{debug, warn};

/// Caller-supplied constraints for one request, byte-denominated.
#[derive(Debug, Clone)]
pub struct SizeConstraints {
    pub target_bytes: u64,
    pub tolerance_bytes: u64,
    pub max_width: u32,
    pub min_duration: f64,
    pub max_duration: f64,
    pub duration_epsilon: f64,
    pub prefer_stable_timing: bool,
    pub verbose: bool,
}

impl SizeConstraints {
    /// Reject malformed constraints before any trial runs.
    pub fn validate(&self) -> Result<()> {
        if self.target_bytes == 0 {
            return Err(GifFitError::InvalidConstraints(
                "target size must be positive".to_string(),
            ));
        }
        if self.tolerance_bytes == 0 {
            return Err(GifFitError::InvalidConstraints(
                "tolerance must be positive".to_string(),
            ));
        }
        if self.max_width == 0 {
            return Err(GifFitError::InvalidConstraints(
                "max width must be positive".to_string(),
            ));
        }
        if !(self.min_duration <= self.max_duration) {
            return Err(GifFitError::InvalidConstraints(format!(
                "duration range is inverted: min {} > max {}",
                self.min_duration, self.max_duration
            )));
        }
        if !(self.duration_epsilon >= 0.0) {
            return Err(GifFitError::InvalidConstraints(
                "duration epsilon must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// One successful trial: the produced artifact and its relation to target.
#[derive(Debug, Clone)]
pub struct TrialOutcome {
    pub profile_index: usize,
    pub bytes: Vec<u8>,
    pub size: u64,
    /// Absolute deviation from target, `|size − target|`.
    pub deviation: u64,
    /// True when `size > target`; false means undersized-or-equal.
    pub oversized: bool,
}

impl TrialOutcome {
    fn from_bytes(profile_index: usize, bytes: Vec<u8>, target: u64) -> Self {
        let size = bytes.len() as u64;
        Self {
            profile_index,
            size,
            deviation: size.abs_diff(target),
            oversized: size > target,
            bytes,
        }
    }

    /// A hit requires staying under budget: undersized-or-equal AND within
    /// tolerance.
    pub fn within_tolerance(&self, tolerance: u64) -> bool {
        !self.oversized && self.deviation <= tolerance
    }
}

/// Seam between the search controller and the encoder backend, so the
/// controller can be exercised without ffmpeg.
pub trait TrialEncoder {
    /// Encode one trial for `profile`. An `Err` marks the trial failed;
    /// the search logs it and continues with other profiles.
    fn encode_trial(&mut self, profile_index: usize, profile: &Profile) -> Result<Vec<u8>>;
}

impl<F> TrialEncoder for F
where
    F: FnMut(usize, &Profile) -> Result<Vec<u8>>,
{
    fn encode_trial(&mut self, profile_index: usize, profile: &Profile) -> Result<Vec<u8>> {
        self(profile_index, profile)
    }
}

/// Result of a search over one profile table.
#[derive(Debug)]
pub struct SearchReport {
    /// The trial to ship: the tolerance hit when `hit`, otherwise the
    /// best-seen candidate. `None` only when every trial failed.
    pub outcome: Option<TrialOutcome>,
    pub hit: bool,
    pub trials_run: u32,
}

#[derive(Default)]
struct SearchState {
    best: Option<TrialOutcome>,
    /// Sign of the most recent *successful* trial; a failed trial leaves it
    /// untouched so the bracket keeps moving by the last observed evidence.
    last_oversized: bool,
    trials_run: u32,
}

impl SearchState {
    /// Replace the stored best on strictly smaller deviation; equal
    /// deviation prefers undersized-or-equal over oversized.
    fn update_best(&mut self, outcome: TrialOutcome) {
        let replace = match &self.best {
            None => true,
            Some(best) => {
                outcome.deviation < best.deviation
                    || (outcome.deviation == best.deviation && !outcome.oversized && best.oversized)
            }
        };
        if replace {
            self.best = Some(outcome);
        }
    }
}

pub struct SizeSearcher<'a> {
    table: &'a [Profile],
    target: u64,
    tolerance: u64,
}

impl<'a> SizeSearcher<'a> {
    pub fn new(table: &'a [Profile], constraints: &SizeConstraints) -> Self {
        Self {
            table,
            target: constraints.target_bytes,
            tolerance: constraints.tolerance_bytes,
        }
    }

    /// Run the boundary-first / binary-search trial sequence.
    ///
    /// Trial order is deterministic for a given table: index 0, then the
    /// last index, then interior midpoints. A tolerance hit returns that
    /// exact trial immediately.
    pub fn search(&self, encoder: &mut dyn TrialEncoder) -> SearchReport {
        let mut state = SearchState::default();
        let len = self.table.len();
        if len == 0 {
            return SearchReport {
                outcome: None,
                hit: false,
                trials_run: 0,
            };
        }

        // Boundary probe: the least aggressive profile first.
        if let Some(outcome) = self.run_trial(encoder, 0, &mut state) {
            if outcome.within_tolerance(self.tolerance) {
                return self.finish_hit(outcome, state.trials_run);
            }
            state.update_best(outcome);
        }

        // Then the most aggressive one.
        if len > 1 {
            if let Some(outcome) = self.run_trial(encoder, len - 1, &mut state) {
                if outcome.within_tolerance(self.tolerance) {
                    return self.finish_hit(outcome, state.trials_run);
                }
                state.update_best(outcome);
            }
        }

        if len <= 2 {
            return SearchReport {
                outcome: state.best,
                hit: false,
                trials_run: state.trials_run,
            };
        }

        // Interior binary search. The cap covers non-monotone ladders where
        // a naive bisection could oscillate.
        let mut low = 1usize;
        let mut high = len - 2;
        let max_iterations = 2 * len;
        let mut iterations = 0;

        while low <= high && iterations < max_iterations {
            iterations += 1;
            let mid = (low + high) / 2;
            if let Some(outcome) = self.run_trial(encoder, mid, &mut state) {
                if outcome.within_tolerance(self.tolerance) {
                    return self.finish_hit(outcome, state.trials_run);
                }
                state.update_best(outcome);
            }
            if state.last_oversized {
                low = mid + 1;
            } else {
                if mid == 0 {
                    break;
                }
                high = mid - 1;
            }
        }

        SearchReport {
            outcome: state.best,
            hit: false,
            trials_run: state.trials_run,
        }
    }

    fn finish_hit(&self, outcome: TrialOutcome, trials_run: u32) -> SearchReport {
        debug!(
            index = outcome.profile_index,
            size = outcome.size,
            deviation = outcome.deviation,
            "Tolerance hit, terminating search"
        );
        SearchReport {
            outcome: Some(outcome),
            hit: true,
            trials_run,
        }
    }

    fn run_trial(
        &self,
        encoder: &mut dyn TrialEncoder,
        index: usize,
        state: &mut SearchState,
    ) -> Option<TrialOutcome> {
        state.trials_run += 1;
        match encoder.encode_trial(index, &self.table[index]) {
            Ok(bytes) => {
                let outcome = TrialOutcome::from_bytes(index, bytes, self.target);
                debug!(
                    index,
                    size = outcome.size,
                    deviation = outcome.deviation,
                    oversized = outcome.oversized,
                    "Trial completed"
                );
                state.last_oversized = outcome.oversized;
                Some(outcome)
            }
            Err(e) => {
                warn!(index, error = %e, "Trial failed, continuing search");
                None
            }
        }
    }
}
