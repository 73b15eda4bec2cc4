//! Spike counts in windows aligned to behavioral events.
//!
//! Two anchors are supported: pole withdrawal, taken from the trial table,
//! and the first lick of the trial, detected from the lick-sensor trace.
//! Both produce a trials × units [`FeatureMatrix`] counting the spikes in
//! the closed window `[event + start_offset, event + stop_offset]`.

use ndarray::Array2;
use serde::Serialize;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::filter::good_trials;
use crate::peaks::{find_peaks, PeakOptions};
use crate::reader::Session;
use crate::types::{round_time, FeatureMatrix, Result, Window};

/// Counts every unit's spikes around one event time per row.
fn count_matrix(session: &Session, anchors: &[(usize, f64)], window: &Window) -> FeatureMatrix {
    let trains = session.spike_trains();
    let mut counts = Array2::<u32>::zeros((anchors.len(), trains.len()));

    for (row, &(_, event)) in anchors.iter().enumerate() {
        let (lo, hi) = window.around(event);
        for (col, train) in trains.iter().enumerate() {
            counts[[row, col]] = train.count_between(lo, hi) as u32;
        }
    }

    FeatureMatrix {
        trials: anchors.iter().map(|&(trial, _)| trial).collect(),
        units: session.unit_ids().to_vec(),
        counts,
    }
}

/// Spike counts in a window after pole withdrawal, one row per trial.
///
/// Fails if a trial index is out of range.
pub fn pole_out_spikes(
    session: &Session,
    trials: &[usize],
    window: &Window,
) -> Result<FeatureMatrix> {
    let table = session.trial_table();
    let anchors = trials
        .iter()
        .map(|&trial| -> Result<(usize, f64)> {
            session.check_trial(trial)?;
            Ok((trial, table[trial].pole_out_time))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(count_matrix(session, &anchors, window))
}

/// Time of the first lick in a trial, if one is detected.
///
/// Only lick samples strictly inside the trial with a positive amplitude
/// are considered; the first peak among their amplitudes is the first
/// lick.
pub fn first_lick(session: &Session, trial: usize, options: &PeakOptions) -> Result<Option<f64>> {
    session.check_trial(trial)?;

    let lick = session.lick_trace();
    let (starts, stops) = session.start_stop_times();
    let inside = lick.samples_inside(starts[trial], stops[trial]);

    let (times, amplitudes): (Vec<f64>, Vec<f64>) = lick.timestamps[inside.clone()]
        .iter()
        .zip(&lick.data[inside])
        .filter(|&(_, &v)| v > 0.0)
        .map(|(&t, &v)| (t, v))
        .unzip();

    let peaks = find_peaks(&amplitudes, options);
    Ok(peaks.first().map(|&p| round_time(times[p])))
}

/// Spike counts in a window around the first lick, one row per trial.
///
/// Trials where no lick is detected have no anchor and are left out of the
/// result; check [`FeatureMatrix::trials`] for the rows actually present.
pub fn movement_spikes(
    session: &Session,
    trials: &[usize],
    window: &Window,
    options: &PeakOptions,
) -> Result<FeatureMatrix> {
    let mut anchors = Vec::with_capacity(trials.len());
    for &trial in trials {
        match first_lick(session, trial, options)? {
            Some(t) => anchors.push((trial, t)),
            None => debug!(trial, "No lick detected, leaving trial out"),
        }
    }

    Ok(count_matrix(session, &anchors, window))
}

/// Result of [`extract`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    /// Trials that passed the filter
    pub trials: Vec<usize>,
    /// Counts aligned to pole withdrawal, one row per filtered trial
    pub pole_out: FeatureMatrix,
    /// Counts aligned to the first lick, for the filtered trials with a
    /// detected lick
    pub movement: FeatureMatrix,
}

/// Filters the session's trials and computes both feature matrices.
pub fn extract(session: &Session, config: &AnalysisConfig) -> Result<Extraction> {
    let trials = good_trials(session, &config.filter);
    debug!(count = trials.len(), "Trials kept after filtering");

    let pole_out = pole_out_spikes(session, &trials, &config.pole_window)?;
    let movement = movement_spikes(session, &trials, &config.movement_window, &config.peaks)?;

    Ok(Extraction {
        trials,
        pole_out,
        movement,
    })
}
