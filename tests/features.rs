mod common;

use alm_importer::{
    extract, first_lick, movement_spikes, pole_out_spikes, AnalysisConfig, PeakOptions,
    SessionError, Window,
};
use common::SyntheticSession;

#[test]
fn pole_out_window_is_closed() {
    let mut synth = SyntheticSession::new(1);
    synth.start[0] = 0.0;
    synth.stop[0] = 2.0;
    synth.pole_out[0] = 0.5;
    synth.lick_t.clear();
    synth.lick_v.clear();
    synth.unit(&[0.1, 0.6, 1.2]).unit(&[0.5, 1.0]);
    let session = synth.build();

    let features = pole_out_spikes(&session, &[0], &Window::POLE_OUT).unwrap();
    assert_eq!(features.trials, vec![0]);
    assert_eq!(features.units, vec!["unit_1", "unit_2"]);
    assert_eq!(features.counts[[0, 0]], 1);
    assert_eq!(features.counts[[0, 1]], 2);
}

#[test]
fn pole_out_rows_follow_requested_trials() {
    let mut synth = SyntheticSession::new(3);
    // Two spikes after pole-out in trial 0, one in trial 2
    synth.unit(&[2.1, 2.4, 5.0, 22.3]);
    let session = synth.build();

    let window = Window {
        start_offset: 0.0,
        stop_offset: 1.0,
    };
    let features = pole_out_spikes(&session, &[2, 0], &window).unwrap();
    assert_eq!(features.trials, vec![2, 0]);
    assert_eq!(features.counts.column(0).to_vec(), vec![1, 2]);
    assert_eq!(features.num_trials(), 2);
    assert_eq!(features.num_units(), 1);
}

#[test]
fn out_of_range_trial_is_an_error() {
    let session = SyntheticSession::new(2).build();
    assert!(matches!(
        pole_out_spikes(&session, &[0, 5], &Window::POLE_OUT),
        Err(SessionError::TrialOutOfRange { index: 5, count: 2 })
    ));
    assert!(first_lick(&session, 2, &PeakOptions::default()).is_err());
}

#[test]
fn first_lick_is_the_bump_peak() {
    let session = SyntheticSession::new(3).build();
    let options = PeakOptions::default();

    assert_eq!(first_lick(&session, 0, &options).unwrap(), Some(4.0));
    assert_eq!(first_lick(&session, 2, &options).unwrap(), Some(24.0));
}

#[test]
fn flat_topped_lick_is_still_the_first_lick() {
    let mut synth = SyntheticSession::new(1);
    // Offset marker, a lick whose top spans two samples, then a lower lick
    let samples = [
        (0.5, -1.0),
        (3.0, 0.1),
        (3.1, 0.5),
        (3.2, 0.9),
        (3.3, 0.9),
        (3.4, 0.5),
        (3.5, 0.1),
        (5.0, 0.1),
        (5.1, 0.8),
        (5.2, 0.1),
    ];
    synth.lick_t = samples.iter().map(|s| s.0).collect();
    synth.lick_v = samples.iter().map(|s| s.1).collect();
    synth.unit(&[3.2, 3.5, 5.1]);
    let session = synth.build();

    let options = PeakOptions {
        threshold: 0.3,
        min_distance: 1,
    };
    assert_eq!(first_lick(&session, 0, &options).unwrap(), Some(3.2));
    assert_eq!(first_lick(&session, 0, &PeakOptions::default()).unwrap(), Some(3.2));

    let features = movement_spikes(&session, &[0], &Window::MOVEMENT, &options).unwrap();
    assert_eq!(features.trials, vec![0]);
    assert_eq!(features.counts[[0, 0]], 2);
}

#[test]
fn flat_lick_trace_has_no_first_lick() {
    let mut synth = SyntheticSession::new(3);
    synth.flatten_licks(1);
    let session = synth.build();

    assert_eq!(first_lick(&session, 1, &PeakOptions::default()).unwrap(), None);
}

#[test]
fn trials_without_a_lick_are_left_out_of_movement_features() {
    let mut synth = SyntheticSession::new(3);
    synth.flatten_licks(1);
    // Around the lick of trial 0 and trial 2, plus one spike outside
    synth.unit(&[3.96, 4.2, 4.44, 4.6, 23.9, 24.0]);
    let session = synth.build();

    let features =
        movement_spikes(&session, &[0, 1, 2], &Window::MOVEMENT, &PeakOptions::default()).unwrap();
    assert_eq!(features.trials, vec![0, 2]);
    assert_eq!(features.counts.column(0).to_vec(), vec![3, 1]);
}

#[test]
fn extraction_runs_filter_then_both_windows() {
    let mut synth = SyntheticSession::new(4);
    for trial in 0..4 {
        synth.flag(0, trial);
    }
    synth.flag(7, 1);
    synth.flatten_licks(3);
    synth.unit(&[2.2, 4.1, 22.0, 34.0]);
    let session = synth.build();

    let extraction = extract(&session, &AnalysisConfig::default()).unwrap();
    assert_eq!(extraction.trials, vec![0, 2, 3]);
    assert_eq!(extraction.pole_out.trials, vec![0, 2, 3]);
    assert_eq!(extraction.pole_out.counts.column(0).to_vec(), vec![1, 1, 0]);
    assert_eq!(extraction.movement.trials, vec![0, 2]);
    assert_eq!(extraction.movement.counts.column(0).to_vec(), vec![1, 0]);
}
