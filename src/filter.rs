//! Selection of the trials that can be analysed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::classify::TrialFlag;
use crate::reader::Session;
use crate::types::TrialTag;

/// Minimum number of lick-sensor samples inside a trial for it to be scored.
pub const MIN_LICK_SAMPLES: usize = 2;

/// Exclusion criteria of [`good_trials`]. Each can be switched off on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    /// Drop photostimulation trials
    pub filter_stim: bool,
    /// Drop trials with a lick before the response cue
    pub filter_lick_early: bool,
    /// Drop trials with fewer than [`MIN_LICK_SAMPLES`] lick samples
    pub filter_non_lick: bool,
    /// Drop trials whose table record has an undefined field
    pub filter_na: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        FilterOptions {
            filter_stim: true,
            filter_lick_early: true,
            filter_non_lick: true,
            filter_na: true,
        }
    }
}

impl FilterOptions {
    /// Options with every criterion switched off.
    pub fn none() -> Self {
        FilterOptions {
            filter_stim: false,
            filter_lick_early: false,
            filter_non_lick: false,
            filter_na: false,
        }
    }
}

/// Trials carrying `flag` in the trial-type matrix or `tag` in their epoch
/// tags.
fn flagged_or_tagged(session: &Session, flag: TrialFlag, tag: &TrialTag) -> BTreeSet<usize> {
    let mut trials: BTreeSet<usize> = session.trials(flag).into_iter().collect();
    trials.extend(
        session
            .trial_tags()
            .iter()
            .enumerate()
            .filter(|(_, tags)| tags.contains(tag))
            .map(|(i, _)| i),
    );
    trials
}

/// Trials without enough lick-sensor coverage to be scored.
fn non_lick_trials(session: &Session) -> BTreeSet<usize> {
    let lick = session.lick_trace();
    let (starts, stops) = session.start_stop_times();
    starts
        .iter()
        .zip(stops)
        .enumerate()
        .filter(|&(_, (&start, &stop))| lick.samples_inside(start, stop).len() < MIN_LICK_SAMPLES)
        .map(|(i, _)| i)
        .collect()
}

/// Ascending indices of the trials that survive every enabled criterion.
///
/// Each criterion removes its trials from the full set independently, so
/// the order they are applied in does not matter.
pub fn good_trials(session: &Session, options: &FilterOptions) -> Vec<usize> {
    let mut candidates: BTreeSet<usize> = (0..session.num_trials()).collect();

    if options.filter_stim {
        let stim = flagged_or_tagged(session, TrialFlag::Stimulated, &TrialTag::Stimulated);
        debug!(count = stim.len(), "Excluding stimulated trials");
        candidates = &candidates - &stim;
    }

    if options.filter_lick_early {
        let early = flagged_or_tagged(session, TrialFlag::EarlyLick, &TrialTag::EarlyLick);
        debug!(count = early.len(), "Excluding early-lick trials");
        candidates = &candidates - &early;
    }

    if options.filter_non_lick {
        let non_lick = non_lick_trials(session);
        debug!(count = non_lick.len(), "Excluding trials without lick samples");
        candidates = &candidates - &non_lick;
    }

    if options.filter_na {
        let table = session.trial_table();
        candidates.retain(|&i| table[i].is_complete());
    }

    candidates.into_iter().collect()
}
