use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Number of decimal places kept for every time value handed out.
pub const TIME_DECIMALS: i32 = 4;

/// Rounds a time value (seconds) to [`TIME_DECIMALS`] decimal places.
///
/// NaN passes through unchanged. Rounding an already rounded value is a
/// no-op.
pub fn round_time(t: f64) -> f64 {
    let scale = 10f64.powi(TIME_DECIMALS);
    (t * scale).round() / scale
}

/// Choice direction of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Left lick port
    Left,
    /// Right lick port
    Right,
}

/// Scored outcome of a trial.
///
/// No-response trials carry no outcome; see [`TrialRecord::outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Correct lick direction
    Hit,
    /// Wrong lick direction
    Error,
}

/// A tag attached to an epoch in the session file.
///
/// Tags are stored as free-form strings; the two that drive trial
/// exclusion are decoded into their own variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrialTag {
    /// Photostimulation trial (`StimTrials`)
    Stimulated,
    /// The animal licked before the response cue (`LickEarly`)
    EarlyLick,
    /// Any other tag, kept verbatim
    Other(String),
}

impl TrialTag {
    /// Decodes a raw tag string.
    pub fn parse(raw: &str) -> Self {
        match raw.trim_matches(char::from(0)).trim() {
            "StimTrials" => TrialTag::Stimulated,
            "LickEarly" => TrialTag::EarlyLick,
            other => TrialTag::Other(other.to_string()),
        }
    }
}

/// One row of the trial table.
///
/// All times are in seconds relative to the session start and rounded to
/// [`TIME_DECIMALS`] places. Undefined times are NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Epoch start
    pub start_time: f64,
    /// Epoch stop
    pub stop_time: f64,
    /// Auditory response cue onset
    pub auditory_cue_time: f64,
    /// Pole moved into reach
    pub pole_in_time: f64,
    /// Pole withdrawn
    pub pole_out_time: f64,
    /// Lick-offset marker from the lick sensor; NaN for trials recorded
    /// before the first marker
    pub lick_stop_time: f64,
    /// Hit or Error; `None` for no-response trials
    pub outcome: Option<Outcome>,
    /// Choice direction
    pub direction: Direction,
}

impl TrialRecord {
    /// Returns true if no field of the record is undefined.
    pub fn is_complete(&self) -> bool {
        self.outcome.is_some()
            && [
                self.start_time,
                self.stop_time,
                self.auditory_cue_time,
                self.pole_in_time,
                self.pole_out_time,
                self.lick_stop_time,
            ]
            .iter()
            .all(|t| !t.is_nan())
    }
}

/// Spike train of a single recorded unit.
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeTrain {
    /// Unit identifier, `unit_<n>`
    pub unit_id: String,
    /// Spike times in seconds, ascending, rounded to [`TIME_DECIMALS`] places
    pub times: Vec<f64>,
    /// Trial index of each spike (0-indexed, parallel to `times`)
    pub trial_ids: Vec<usize>,
}

impl SpikeTrain {
    /// Number of spikes with `lo <= t <= hi`.
    pub fn count_between(&self, lo: f64, hi: f64) -> usize {
        let first = self.times.partition_point(|&t| t < lo);
        let past = self.times.partition_point(|&t| t <= hi);
        past.saturating_sub(first)
    }
}

/// Raw lick-sensor trace.
///
/// Irregularly sampled. Negative amplitudes are sensor artifacts that mark
/// lick offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct LickTrace {
    /// Sample times in seconds, non-decreasing
    pub timestamps: Vec<f64>,
    /// Signed sensor amplitude
    pub data: Vec<f64>,
}

impl LickTrace {
    /// Range of sample indices whose timestamp lies strictly inside `(lo, hi)`.
    pub fn samples_inside(&self, lo: f64, hi: f64) -> std::ops::Range<usize> {
        let first = self.timestamps.partition_point(|&t| t <= lo);
        let past = self.timestamps.partition_point(|&t| t < hi);
        first..past.max(first)
    }

    /// Timestamps of the first sample of every maximal run of negative
    /// amplitudes, in recording order.
    pub fn negative_segments(&self) -> Vec<f64> {
        let mut onsets = Vec::new();
        let mut inside = false;
        for (&t, &v) in self.timestamps.iter().zip(self.data.iter()) {
            let negative = v < 0.0;
            if negative && !inside {
                onsets.push(t);
            }
            inside = negative;
        }
        onsets
    }
}

/// A spike-count window anchored to a reference event.
///
/// The window is `[event + start_offset, event + stop_offset]`, closed on
/// both ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    /// Offset of the window start from the event (seconds)
    pub start_offset: f64,
    /// Offset of the window end from the event (seconds)
    pub stop_offset: f64,
}

impl Window {
    /// Default window after pole withdrawal.
    pub const POLE_OUT: Window = Window {
        start_offset: 0.0,
        stop_offset: 0.5,
    };

    /// Default window around the first lick.
    pub const MOVEMENT: Window = Window {
        start_offset: -0.05,
        stop_offset: 0.45,
    };

    /// Absolute bounds of the window for an event at `t`.
    pub fn around(&self, t: f64) -> (f64, f64) {
        (t + self.start_offset, t + self.stop_offset)
    }
}

/// Trials × units spike-count matrix.
///
/// Row `i` belongs to trial `trials[i]`, column `j` to unit `units[j]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMatrix {
    /// Trial index of each row
    pub trials: Vec<usize>,
    /// Unit identifier of each column
    pub units: Vec<String>,
    /// Spike counts
    /// - Shape: [num_trials, num_units]
    pub counts: Array2<u32>,
}

impl FeatureMatrix {
    /// Number of rows (trials).
    pub fn num_trials(&self) -> usize {
        self.trials.len()
    }

    /// Number of columns (units).
    pub fn num_units(&self) -> usize {
        self.units.len()
    }
}

/// Errors raised while loading or analysing a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A required path is missing or its contents are malformed
    #[error("bad file format at `{path}`: {reason}")]
    FileFormat { path: String, reason: String },
    /// A trial-type flag name that is not recognised
    #[error("unknown trial-type flag `{0}`")]
    UnknownFlag(String),
    /// Lick-offset markers cannot be matched one-to-one with trials
    #[error(
        "found {segments} lick-offset segments but {expected} trials from index {cut} onwards"
    )]
    Reconciliation {
        segments: usize,
        expected: usize,
        cut: usize,
    },
    /// A trial index outside the session
    #[error("trial index {index} out of range for {count} trials")]
    TrialOutOfRange { index: usize, count: usize },
    /// A classifier network description that cannot be built
    #[error("invalid network: {0}")]
    InvalidNetwork(String),
    /// Configuration could not be parsed
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
    /// An I/O error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// The HDF5 library reported an error
    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),
}

impl SessionError {
    pub(crate) fn format(path: impl Into<String>, reason: impl Into<String>) -> Self {
        SessionError::FileFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SessionError>;
