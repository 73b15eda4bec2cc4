#![allow(dead_code)]

use alm_importer::{Dataset, MemorySource, Session};
use ndarray::{Array1, Array2};

/// Spacing between trial starts in the synthetic sessions.
pub const TRIAL_SPACING: f64 = 10.0;
/// Lick-sensor sampling interval.
pub const LICK_DT: f64 = 0.002;

/// A hand-built session, written out to a [`MemorySource`].
///
/// Trial `i` runs from `10i + 1` to `10i + 9`. The pole goes out at
/// `10i + 2`, every trial has one lick bump peaking at `10i + 4`, and a
/// lick-offset marker sits at `10i + 0.5`, so every trial gets a lick stop.
#[derive(Debug, Clone)]
pub struct SyntheticSession {
    pub start: Vec<f64>,
    pub stop: Vec<f64>,
    pub auditory_cue: Vec<f64>,
    pub pole_in: Vec<f64>,
    pub pole_out: Vec<f64>,
    pub trial_types: Array2<f64>,
    pub tags: Vec<Option<Vec<String>>>,
    pub lick_t: Vec<f64>,
    pub lick_v: Vec<f64>,
    pub units: Vec<(String, Vec<f64>)>,
}

impl SyntheticSession {
    /// `n` trials with no trial-type bits set and no units.
    pub fn new(n: usize) -> Self {
        let base = |i: usize| TRIAL_SPACING * i as f64;
        let mut session = SyntheticSession {
            start: (0..n).map(|i| base(i) + 1.0).collect(),
            stop: (0..n).map(|i| base(i) + 9.0).collect(),
            auditory_cue: (0..n).map(|i| base(i) + 3.0).collect(),
            pole_in: (0..n).map(|i| base(i) + 1.5).collect(),
            pole_out: (0..n).map(|i| base(i) + 2.0).collect(),
            trial_types: Array2::zeros((8, n)),
            tags: vec![None; n],
            lick_t: Vec::new(),
            lick_v: Vec::new(),
            units: Vec::new(),
        };
        for i in 0..n {
            session.push_trial_licks(i, true);
        }
        session
    }

    fn push_trial_licks(&mut self, trial: usize, with_bump: bool) {
        let base = TRIAL_SPACING * trial as f64;
        self.lick_t.push(base + 0.5);
        self.lick_v.push(-1.0);
        self.lick_t.push(base + 0.6);
        self.lick_v.push(0.1);

        let centre = base + 4.0;
        for k in 0..=3000 {
            let t = base + 2.0 + k as f64 * LICK_DT;
            let bump = if with_bump {
                (-((t - centre) / 0.02).powi(2)).exp()
            } else {
                0.0
            };
            self.lick_t.push(t);
            self.lick_v.push(0.1 + bump);
        }
    }

    /// Rebuilds the lick trace so that `trial` has a flat trace.
    pub fn flatten_licks(&mut self, trial: usize) {
        let n = self.start.len();
        self.lick_t.clear();
        self.lick_v.clear();
        for i in 0..n {
            self.push_trial_licks(i, i != trial);
        }
    }

    /// Drops every lick sample of `trial` except its offset marker.
    pub fn remove_licks(&mut self, trial: usize) {
        let base = TRIAL_SPACING * trial as f64;
        let keep: Vec<bool> = self
            .lick_t
            .iter()
            .map(|&t| !(t > base + 1.0 && t < base + 9.0))
            .collect();
        let mut flags = keep.iter();
        self.lick_t.retain(|_| *flags.next().unwrap());
        let mut flags = keep.iter();
        self.lick_v.retain(|_| *flags.next().unwrap());
    }

    /// Sets bit `row` of the trial-type matrix for `trial`.
    pub fn flag(&mut self, row: usize, trial: usize) -> &mut Self {
        self.trial_types[[row, trial]] = 1.0;
        self
    }

    /// Adds a unit firing at `times`.
    pub fn unit(&mut self, times: &[f64]) -> &mut Self {
        let id = format!("unit_{}", self.units.len() + 1);
        self.units.push((id, times.to_vec()));
        self
    }

    /// 1-indexed trial id of a spike at `t`.
    fn trial_id(&self, t: f64) -> f64 {
        let before = self.start.iter().filter(|&&s| s <= t).count();
        before.max(1) as f64
    }

    pub fn source(&self) -> MemorySource {
        let n = self.start.len();
        let mut source = MemorySource::new();

        source
            .insert(
                "/session_start_time",
                Dataset::Strings(vec!["2013-07-01T12:00:00".into()]),
            )
            .insert(
                "/processing/extracellular_units/UnitTimes/unit_list",
                Dataset::Strings(self.units.iter().map(|u| u.0.clone()).collect()),
            )
            .insert(
                "/processing/extracellular_units/UnitTimes/cell_types",
                Dataset::Strings(vec!["pyramidal".into(); self.units.len()]),
            )
            .insert("/analysis/trial_type_mat", Dataset::Matrix(self.trial_types.clone()))
            .insert(
                "/stimulus/presentation/auditory_cue/timestamps",
                Dataset::Numbers(Array1::from_vec(self.auditory_cue.clone())),
            )
            .insert(
                "/stimulus/presentation/pole_in/timestamps",
                Dataset::Numbers(Array1::from_vec(self.pole_in.clone())),
            )
            .insert(
                "/stimulus/presentation/pole_out/timestamps",
                Dataset::Numbers(Array1::from_vec(self.pole_out.clone())),
            )
            .insert(
                "/acquisition/timeseries/lick_trace/timestamps",
                Dataset::Numbers(Array1::from_vec(self.lick_t.clone())),
            )
            .insert(
                "/acquisition/timeseries/lick_trace/data",
                Dataset::Numbers(Array1::from_vec(self.lick_v.clone())),
            );

        for i in 0..n {
            let epoch = format!("/epochs/trial_{:03}", i + 1);
            source
                .insert(
                    &format!("{}/start_time", epoch),
                    Dataset::Numbers(Array1::from_vec(vec![self.start[i]])),
                )
                .insert(
                    &format!("{}/stop_time", epoch),
                    Dataset::Numbers(Array1::from_vec(vec![self.stop[i]])),
                );
            if let Some(tags) = &self.tags[i] {
                source.insert(&format!("{}/tags", epoch), Dataset::Strings(tags.clone()));
            }
        }

        for (id, times) in &self.units {
            let prefix = format!("/processing/extracellular_units/UnitTimes/{}", id);
            let ids = times.iter().map(|&t| self.trial_id(t)).collect();
            source
                .insert(
                    &format!("{}/times", prefix),
                    Dataset::Numbers(Array1::from_vec(times.clone())),
                )
                .insert(&format!("{}/trial_ids", prefix), Dataset::Numbers(Array1::from_vec(ids)));
        }

        source
    }

    pub fn build(&self) -> Session {
        Session::from_source(self.source()).expect("synthetic session loads")
    }
}
