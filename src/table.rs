//! Assembly of the per-trial table.

use ndarray::Array2;
use tracing::{debug, warn};

use crate::classify::{TrialFlag, TRIAL_TYPE_ROWS};
use crate::types::{round_time, Direction, LickTrace, Outcome, Result, SessionError, TrialRecord};

/// Per-epoch event times, one entry per trial in epoch order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EpochTimes {
    /// Epoch start times
    pub start: Vec<f64>,
    /// Epoch stop times
    pub stop: Vec<f64>,
    /// Auditory cue onsets
    pub auditory_cue: Vec<f64>,
    /// Pole-in times
    pub pole_in: Vec<f64>,
    /// Pole-out times
    pub pole_out: Vec<f64>,
}

impl EpochTimes {
    /// Number of trials.
    pub fn len(&self) -> usize {
        self.start.len()
    }

    /// Returns true if there are no trials.
    pub fn is_empty(&self) -> bool {
        self.start.is_empty()
    }

    /// Fails unless every event array has one entry per trial.
    fn check_lengths(&self) -> Result<()> {
        let columns = [
            ("stop", self.stop.len()),
            ("auditory_cue", self.auditory_cue.len()),
            ("pole_in", self.pole_in.len()),
            ("pole_out", self.pole_out.len()),
        ];
        for (name, len) in columns {
            if len != self.len() {
                return Err(SessionError::format(
                    name,
                    format!("{} values for {} trials", len, self.len()),
                ));
            }
        }
        Ok(())
    }
}

/// Matches lick-offset markers to trials.
///
/// Markers are the negative-amplitude segments of the lick trace. Trials
/// that start before the first marker get NaN; every later trial takes the
/// next marker in order. Fails if the markers and those trials do not pair
/// up one-to-one.
pub fn lick_stop_times(start_times: &[f64], lick: &LickTrace) -> Result<Vec<f64>> {
    let num_trials = start_times.len();
    let segments = lick.negative_segments();

    let cut = match segments.first() {
        Some(&first) => start_times
            .iter()
            .position(|&start| start > first)
            .unwrap_or(num_trials),
        None => num_trials,
    };
    debug!(
        cut,
        segments = segments.len(),
        "Matching lick-offset markers to trials"
    );

    if num_trials - cut != segments.len() {
        return Err(SessionError::Reconciliation {
            segments: segments.len(),
            expected: num_trials - cut,
            cut,
        });
    }

    let mut stops = vec![f64::NAN; cut];
    stops.extend(segments);
    Ok(stops)
}

/// Builds one [`TrialRecord`] per epoch.
///
/// Direction defaults to right and outcome to undefined. A trial flagged as
/// both hit and error ends up as an error. Fails if the event arrays or
/// the trial-type matrix disagree on the number of trials.
pub fn build_trial_table(
    times: &EpochTimes,
    trial_types: &Array2<bool>,
    lick: &LickTrace,
) -> Result<Vec<TrialRecord>> {
    times.check_lengths()?;
    let num_trials = times.len();
    if trial_types.dim() != (TRIAL_TYPE_ROWS, num_trials) {
        return Err(SessionError::format(
            "trial_type_mat",
            format!(
                "expected a {}x{} matrix, found {}x{}",
                TRIAL_TYPE_ROWS,
                num_trials,
                trial_types.nrows(),
                trial_types.ncols()
            ),
        ));
    }

    let mut directions = vec![Direction::Right; num_trials];
    for i in TrialFlag::Left.select(trial_types) {
        directions[i] = Direction::Left;
    }

    let mut outcomes: Vec<Option<Outcome>> = vec![None; num_trials];
    for i in TrialFlag::Hit.select(trial_types) {
        outcomes[i] = Some(Outcome::Hit);
    }
    for i in TrialFlag::Error.select(trial_types) {
        if outcomes[i] == Some(Outcome::Hit) {
            warn!(trial = i, "Trial flagged as both hit and error, keeping error");
        }
        outcomes[i] = Some(Outcome::Error);
    }

    let lick_stops = lick_stop_times(&times.start, lick)?;

    let table = (0..num_trials)
        .map(|i| TrialRecord {
            start_time: round_time(times.start[i]),
            stop_time: round_time(times.stop[i]),
            auditory_cue_time: round_time(times.auditory_cue[i]),
            pole_in_time: round_time(times.pole_in[i]),
            pole_out_time: round_time(times.pole_out[i]),
            lick_stop_time: round_time(lick_stops[i]),
            outcome: outcomes[i],
            direction: directions[i],
        })
        .collect();

    Ok(table)
}
