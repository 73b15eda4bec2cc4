use ndarray::{Array1, Array2};
use std::time::Instant;
use tracing::{debug, info};

use crate::classify::{TrialFlag, TRIAL_TYPE_ROWS};
use crate::source::{DataSource, Dataset};
use crate::table::{build_trial_table, EpochTimes};
use crate::types::*;

// Layout of an ALM behavior-session NWB file
const SESSION_START_TIME: &str = "/session_start_time";
const UNIT_TIMES: &str = "/processing/extracellular_units/UnitTimes";
const UNIT_LIST: &str = "/processing/extracellular_units/UnitTimes/unit_list";
const CELL_TYPES: &str = "/processing/extracellular_units/UnitTimes/cell_types";
const EPOCHS: &str = "/epochs";
const TRIAL_TYPE_MAT: &str = "/analysis/trial_type_mat";
const AUDITORY_CUE: &str = "/stimulus/presentation/auditory_cue/timestamps";
const POLE_IN: &str = "/stimulus/presentation/pole_in/timestamps";
const POLE_OUT: &str = "/stimulus/presentation/pole_out/timestamps";
const LICK_DATA: &str = "/acquisition/timeseries/lick_trace/data";
const LICK_TIMESTAMPS: &str = "/acquisition/timeseries/lick_trace/timestamps";

const UNIT_PREFIX: &str = "unit_";

/// One recording session, fully loaded into memory.
///
/// Every accessor returns data read once at construction, so repeated calls
/// always agree. Only [`Session::fetch`] and [`Session::members`] go back to
/// the backing store.
///
/// # Examples
///
/// ```no_run
/// # #[cfg(feature = "hdf5")]
/// # fn main() -> Result<(), alm_importer::SessionError> {
/// use alm_importer::{Session, TrialFlag};
///
/// let session = Session::open("data/ANM210861_20130701.nwb")?;
/// println!("{} trials, {} units", session.num_trials(), session.num_units());
/// println!("left trials: {:?}", session.trials(TrialFlag::Left));
/// # Ok(())
/// # }
/// # #[cfg(not(feature = "hdf5"))]
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct Session {
    source: Box<dyn DataSource>,
    session_start_time: String,
    unit_ids: Vec<String>,
    cell_types: Vec<String>,
    epoch_ids: Vec<String>,
    trial_types: Array2<bool>,
    epoch_times: EpochTimes,
    trial_tags: Vec<Vec<TrialTag>>,
    lick: LickTrace,
    spikes: Vec<SpikeTrain>,
    trial_table: Vec<TrialRecord>,
}

impl Session {
    /// Loads a session from an NWB file on disk.
    #[cfg(feature = "hdf5")]
    pub fn open<P: AsRef<std::path::Path>>(file_path: P) -> Result<Session> {
        let source = crate::source::Hdf5Source::open(file_path)?;
        Session::from_source(source)
    }

    /// Loads a session from any [`DataSource`].
    ///
    /// Fails with [`SessionError::FileFormat`] if a required path is missing
    /// or malformed, and with [`SessionError::Reconciliation`] if the lick
    /// trace's offset markers cannot be matched to trials.
    pub fn from_source<S: DataSource + 'static>(source: S) -> Result<Session> {
        let tic = Instant::now();

        let session_start_time = read_session_start_time(&source)?;
        let unit_ids = read_unit_ids(&source)?;
        let cell_types = required(&source, CELL_TYPES)?.into_strings(CELL_TYPES)?;
        if cell_types.len() != unit_ids.len() {
            return Err(SessionError::format(
                CELL_TYPES,
                format!(
                    "{} cell types for {} units",
                    cell_types.len(),
                    unit_ids.len()
                ),
            ));
        }

        let epoch_ids = source
            .members(EPOCHS)?
            .ok_or_else(|| SessionError::format(EPOCHS, "missing required group"))?;
        let num_trials = epoch_ids.len();

        let (start, stop, trial_tags) = read_epochs(&source, &epoch_ids)?;
        let epoch_times = EpochTimes {
            start,
            stop,
            auditory_cue: read_per_trial(&source, AUDITORY_CUE, num_trials)?,
            pole_in: read_per_trial(&source, POLE_IN, num_trials)?,
            pole_out: read_per_trial(&source, POLE_OUT, num_trials)?,
        };

        let trial_types = read_trial_types(&source, num_trials)?;
        let lick = read_lick_trace(&source)?;
        let spikes = unit_ids
            .iter()
            .map(|unit| read_spike_train(&source, unit, num_trials))
            .collect::<Result<Vec<_>>>()?;

        let trial_table = build_trial_table(&epoch_times, &trial_types, &lick)?;

        print_session_summary(num_trials, &unit_ids, &lick);
        info!(
            "Done! Elapsed time: {:.1} seconds",
            tic.elapsed().as_secs_f64()
        );

        Ok(Session {
            source: Box::new(source),
            session_start_time,
            unit_ids,
            cell_types,
            epoch_ids,
            trial_types,
            epoch_times,
            trial_tags,
            lick,
            spikes,
            trial_table,
        })
    }

    /// Session start time as stored in the file.
    pub fn session_start_time(&self) -> &str {
        &self.session_start_time
    }

    /// Unit identifiers, in file order.
    pub fn unit_ids(&self) -> &[String] {
        &self.unit_ids
    }

    /// Cell-type label of each unit.
    pub fn cell_types(&self) -> &[String] {
        &self.cell_types
    }

    /// Epoch identifiers. Position in this list is the trial index.
    pub fn epoch_ids(&self) -> &[String] {
        &self.epoch_ids
    }

    /// Number of trials.
    pub fn num_trials(&self) -> usize {
        self.epoch_ids.len()
    }

    /// Number of recorded units.
    pub fn num_units(&self) -> usize {
        self.unit_ids.len()
    }

    /// Trial-type bit matrix.
    /// - Shape: [8, num_trials]
    pub fn trial_types(&self) -> &Array2<bool> {
        &self.trial_types
    }

    /// Raw per-trial event times.
    pub fn epoch_times(&self) -> &EpochTimes {
        &self.epoch_times
    }

    /// Epoch start and stop times.
    pub fn start_stop_times(&self) -> (&[f64], &[f64]) {
        (&self.epoch_times.start, &self.epoch_times.stop)
    }

    /// Decoded tags of each epoch; empty where the epoch has none.
    pub fn trial_tags(&self) -> &[Vec<TrialTag>] {
        &self.trial_tags
    }

    /// Raw lick-sensor trace.
    pub fn lick_trace(&self) -> &LickTrace {
        &self.lick
    }

    /// Spike trains of all units, in unit order.
    pub fn spike_trains(&self) -> &[SpikeTrain] {
        &self.spikes
    }

    /// Spike trains of the named units, in the order given.
    pub fn spike_times_for<S: AsRef<str>>(&self, unit_ids: &[S]) -> Result<Vec<&SpikeTrain>> {
        unit_ids
            .iter()
            .map(|id| {
                let id = id.as_ref();
                self.spikes.iter().find(|s| s.unit_id == id).ok_or_else(|| {
                    SessionError::format(format!("{}/{}", UNIT_TIMES, id), "no such unit")
                })
            })
            .collect()
    }

    /// 0-indexed trial assignment of every spike, per unit.
    pub fn spike_trial_ids(&self) -> Vec<&[usize]> {
        self.spikes.iter().map(|s| s.trial_ids.as_slice()).collect()
    }

    /// The trial table, one record per epoch.
    pub fn trial_table(&self) -> &[TrialRecord] {
        &self.trial_table
    }

    /// Indices of trials carrying `flag`, ascending.
    pub fn trials(&self, flag: TrialFlag) -> Vec<usize> {
        flag.select(&self.trial_types)
    }

    /// Like [`Session::trials`], with the flag given by name.
    pub fn trials_named(&self, flag: &str) -> Result<Vec<usize>> {
        Ok(self.trials(flag.parse()?))
    }

    /// Reads an arbitrary path from the backing store.
    ///
    /// Returns `Ok(None)` if nothing is stored there.
    pub fn fetch(&self, path: &str) -> Result<Option<Dataset>> {
        self.source.read(path)
    }

    /// Lists the children of a group in the backing store, or `None` if the
    /// group does not exist.
    pub fn members(&self, path: &str) -> Result<Option<Vec<String>>> {
        self.source.members(path)
    }

    /// Spike times of each unit within one trial, shifted by `t_offset`.
    ///
    /// Spikes are assigned to trials by their recorded trial id.
    pub fn raster(&self, trial: usize, t_offset: f64) -> Result<Vec<Vec<f64>>> {
        self.check_trial(trial)?;
        Ok(self
            .spikes
            .iter()
            .map(|train| {
                train
                    .times
                    .iter()
                    .zip(&train.trial_ids)
                    .filter(|&(_, &id)| id == trial)
                    .map(|(&t, _)| t - t_offset)
                    .collect()
            })
            .collect())
    }

    pub(crate) fn check_trial(&self, index: usize) -> Result<()> {
        if index < self.num_trials() {
            Ok(())
        } else {
            Err(SessionError::TrialOutOfRange {
                index,
                count: self.num_trials(),
            })
        }
    }
}

/// Reads a path that must exist
fn required(source: &dyn DataSource, path: &str) -> Result<Dataset> {
    source
        .read(path)?
        .ok_or_else(|| SessionError::format(path, "missing required dataset"))
}

fn read_session_start_time(source: &dyn DataSource) -> Result<String> {
    match required(source, SESSION_START_TIME)? {
        Dataset::Strings(values) => values
            .into_iter()
            .next()
            .ok_or_else(|| SessionError::format(SESSION_START_TIME, "empty dataset")),
        other => Ok(other.into_scalar(SESSION_START_TIME)?.to_string()),
    }
}

fn read_unit_ids(source: &dyn DataSource) -> Result<Vec<String>> {
    let unit_ids = required(source, UNIT_LIST)?.into_strings(UNIT_LIST)?;
    for unit in &unit_ids {
        let valid = unit
            .strip_prefix(UNIT_PREFIX)
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
        if !valid {
            return Err(SessionError::format(
                UNIT_LIST,
                format!("unit id `{}` is not of the form {}<n>", unit, UNIT_PREFIX),
            ));
        }
    }
    Ok(unit_ids)
}

/// Helper function to read start/stop times and tags of every epoch
fn read_epochs(
    source: &dyn DataSource,
    epoch_ids: &[String],
) -> Result<(Vec<f64>, Vec<f64>, Vec<Vec<TrialTag>>)> {
    let mut start = Vec::with_capacity(epoch_ids.len());
    let mut stop = Vec::with_capacity(epoch_ids.len());
    let mut tags = Vec::with_capacity(epoch_ids.len());

    for epoch in epoch_ids {
        let start_path = format!("{}/{}/start_time", EPOCHS, epoch);
        let stop_path = format!("{}/{}/stop_time", EPOCHS, epoch);
        let tags_path = format!("{}/{}/tags", EPOCHS, epoch);

        start.push(required(source, &start_path)?.into_scalar(&start_path)?);
        stop.push(required(source, &stop_path)?.into_scalar(&stop_path)?);

        let epoch_tags = match source.read(&tags_path)? {
            Some(ds) => ds
                .into_strings(&tags_path)?
                .iter()
                .map(|t| TrialTag::parse(t))
                .collect(),
            None => Vec::new(),
        };
        tags.push(epoch_tags);
    }

    Ok((start, stop, tags))
}

fn read_per_trial(source: &dyn DataSource, path: &str, num_trials: usize) -> Result<Vec<f64>> {
    let values = required(source, path)?.into_numbers(path)?;
    if values.len() != num_trials {
        return Err(SessionError::format(
            path,
            format!("{} values for {} trials", values.len(), num_trials),
        ));
    }
    Ok(values.to_vec())
}

fn read_trial_types(source: &dyn DataSource, num_trials: usize) -> Result<Array2<bool>> {
    let matrix = required(source, TRIAL_TYPE_MAT)?.into_matrix(TRIAL_TYPE_MAT)?;
    if matrix.dim() != (TRIAL_TYPE_ROWS, num_trials) {
        return Err(SessionError::format(
            TRIAL_TYPE_MAT,
            format!(
                "expected a {}x{} matrix, found {}x{}",
                TRIAL_TYPE_ROWS,
                num_trials,
                matrix.nrows(),
                matrix.ncols()
            ),
        ));
    }
    Ok(matrix.mapv(|v| v != 0.0))
}

fn read_lick_trace(source: &dyn DataSource) -> Result<LickTrace> {
    let data = required(source, LICK_DATA)?.into_numbers(LICK_DATA)?;
    let timestamps = required(source, LICK_TIMESTAMPS)?.into_numbers(LICK_TIMESTAMPS)?;

    if data.len() != timestamps.len() {
        return Err(SessionError::format(
            LICK_DATA,
            format!(
                "{} samples but {} timestamps",
                data.len(),
                timestamps.len()
            ),
        ));
    }
    let timestamps = timestamps.to_vec();
    if timestamps.iter().any(|t| t.is_nan()) {
        return Err(SessionError::format(LICK_TIMESTAMPS, "timestamps contain NaN"));
    }
    // Lookups by time rely on this ordering
    if timestamps.windows(2).any(|w| w[1] < w[0]) {
        return Err(SessionError::format(
            LICK_TIMESTAMPS,
            "timestamps are not in ascending order",
        ));
    }

    Ok(LickTrace {
        timestamps,
        data: data.to_vec(),
    })
}

/// Helper function to read one unit's spike times and trial assignments
fn read_spike_train(source: &dyn DataSource, unit: &str, num_trials: usize) -> Result<SpikeTrain> {
    let times_path = format!("{}/{}/times", UNIT_TIMES, unit);
    let ids_path = format!("{}/{}/trial_ids", UNIT_TIMES, unit);

    let times: Array1<f64> = required(source, &times_path)?.into_numbers(&times_path)?;
    let raw_ids: Array1<f64> = required(source, &ids_path)?.into_numbers(&ids_path)?;

    if times.len() != raw_ids.len() {
        return Err(SessionError::format(
            &ids_path,
            format!("{} trial ids for {} spikes", raw_ids.len(), times.len()),
        ));
    }

    // Trial ids are 1-indexed in the file
    let mut spikes = Vec::with_capacity(times.len());
    for (&t, &id) in times.iter().zip(raw_ids.iter()) {
        if id.fract() != 0.0 || id < 1.0 || id > num_trials as f64 {
            return Err(SessionError::format(
                &ids_path,
                format!("trial id {} outside 1..={}", id, num_trials),
            ));
        }
        spikes.push((round_time(t), id as usize - 1));
    }

    if spikes.windows(2).any(|w| w[1].0 < w[0].0) {
        debug!(unit, "Sorting unordered spike times");
        spikes.sort_by(|a, b| a.0.total_cmp(&b.0));
    }

    let (times, trial_ids): (Vec<f64>, Vec<usize>) = spikes.into_iter().unzip();
    Ok(SpikeTrain {
        unit_id: unit.to_string(),
        times,
        trial_ids,
    })
}

/// Logs a summary of what was loaded
fn print_session_summary(num_trials: usize, unit_ids: &[String], lick: &LickTrace) {
    info!(
        trials = num_trials,
        units = unit_ids.len(),
        lick_samples = lick.timestamps.len(),
        "Loaded ALM behavior session"
    );
    if let (Some(first), Some(last)) = (lick.timestamps.first(), lick.timestamps.last()) {
        debug!("Lick trace spans {:.3} to {:.3} seconds", first, last);
    }
}
