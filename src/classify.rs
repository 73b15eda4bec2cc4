//! Decoding of the trial-type bit matrix.
//!
//! Each of the eight rows of the matrix marks one combination of choice and
//! outcome, or one exception:
//!
//! | row | meaning                  |
//! |-----|--------------------------|
//! | 0   | right, hit               |
//! | 1   | left, hit                |
//! | 2   | right, error             |
//! | 3   | left, error              |
//! | 4   | right, no response       |
//! | 5   | left, no response        |
//! | 6   | licked early             |
//! | 7   | photostimulated          |

use ndarray::{Array2, Axis};
use std::fmt;
use std::str::FromStr;

use crate::types::SessionError;

/// Number of rows in the trial-type matrix.
pub const TRIAL_TYPE_ROWS: usize = 8;

/// A named subset of trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrialFlag {
    /// Every trial
    All,
    /// Left-choice trials
    Left,
    /// Right-choice trials
    Right,
    /// Correct trials
    Hit,
    /// Incorrect trials
    Error,
    /// Trials without a response lick
    NoResponse,
    /// Trials with a lick before the response cue
    EarlyLick,
    /// Photostimulation trials
    Stimulated,
}

impl TrialFlag {
    /// Every flag, in declaration order.
    pub const ALL: [TrialFlag; 8] = [
        TrialFlag::All,
        TrialFlag::Left,
        TrialFlag::Right,
        TrialFlag::Hit,
        TrialFlag::Error,
        TrialFlag::NoResponse,
        TrialFlag::EarlyLick,
        TrialFlag::Stimulated,
    ];

    /// Matrix rows that make up this flag.
    pub const fn rows(self) -> &'static [usize] {
        match self {
            TrialFlag::All => &[0, 1, 2, 3, 4, 5, 6, 7],
            TrialFlag::Right => &[0, 2, 4],
            TrialFlag::Left => &[1, 3, 5],
            TrialFlag::Hit => &[0, 1],
            TrialFlag::Error => &[2, 3],
            TrialFlag::NoResponse => &[4, 5],
            TrialFlag::EarlyLick => &[6],
            TrialFlag::Stimulated => &[7],
        }
    }

    /// Canonical name.
    pub const fn name(self) -> &'static str {
        match self {
            TrialFlag::All => "all",
            TrialFlag::Left => "left",
            TrialFlag::Right => "right",
            TrialFlag::Hit => "hit",
            TrialFlag::Error => "error",
            TrialFlag::NoResponse => "no-response",
            TrialFlag::EarlyLick => "early-lick",
            TrialFlag::Stimulated => "stimulated",
        }
    }

    /// Ascending indices of the trials carrying this flag.
    ///
    /// A trial belongs to a flag when any of the flag's rows is set for it.
    /// `All` always yields `0..N`. Rows past the end of a matrix with fewer
    /// than [`TRIAL_TYPE_ROWS`] rows count as unset; sessions loaded through
    /// [`crate::Session`] always carry all of them.
    pub fn select(self, trial_types: &Array2<bool>) -> Vec<usize> {
        let num_trials = trial_types.len_of(Axis(1));
        if self == TrialFlag::All {
            return (0..num_trials).collect();
        }

        (0..num_trials)
            .filter(|&trial| {
                self.rows()
                    .iter()
                    .filter(|&&row| row < trial_types.nrows())
                    .any(|&row| trial_types[[row, trial]])
            })
            .collect()
    }
}

impl fmt::Display for TrialFlag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrialFlag {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let flag = match s {
            "all" => TrialFlag::All,
            "left" | "L" => TrialFlag::Left,
            "right" | "R" => TrialFlag::Right,
            "hit" => TrialFlag::Hit,
            "error" | "err" => TrialFlag::Error,
            "no-response" | "nolick" => TrialFlag::NoResponse,
            "early-lick" | "lick_early" => TrialFlag::EarlyLick,
            "stimulated" | "stim_trials" => TrialFlag::Stimulated,
            other => return Err(SessionError::UnknownFlag(other.to_string())),
        };
        Ok(flag)
    }
}
