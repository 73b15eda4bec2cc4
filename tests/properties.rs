mod common;

use alm_importer::{good_trials, round_time, FilterOptions, TrialFlag};
use common::SyntheticSession;
use ndarray::Array2;
use proptest::prelude::*;

fn options(bits: u8) -> FilterOptions {
    FilterOptions {
        filter_stim: bits & 1 != 0,
        filter_lick_early: bits & 2 != 0,
        filter_non_lick: bits & 4 != 0,
        filter_na: bits & 8 != 0,
    }
}

fn session_from(bits: &[bool], n: usize, no_licks: &[bool]) -> alm_importer::Session {
    let mut synth = SyntheticSession::new(n);
    synth.trial_types = Array2::from_shape_fn((8, n), |(r, c)| {
        if bits[r * n + c] {
            1.0
        } else {
            0.0
        }
    });
    for (trial, &drop) in no_licks.iter().enumerate() {
        if drop {
            synth.remove_licks(trial);
        }
    }
    synth.build()
}

proptest! {
    #[test]
    fn rounding_is_idempotent(x in -1.0e6f64..1.0e6) {
        let once = round_time(x);
        prop_assert_eq!(round_time(once), once);
    }

    #[test]
    fn all_flag_covers_every_trial(bits in prop::collection::vec(any::<bool>(), 8 * 7)) {
        let m = Array2::from_shape_vec((8, 7), bits).unwrap();
        prop_assert_eq!(TrialFlag::All.select(&m), (0..7).collect::<Vec<_>>());
        for flag in TrialFlag::ALL {
            let selected = flag.select(&m);
            prop_assert!(selected.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn enabling_criteria_never_grows_the_result(
        bits in prop::collection::vec(any::<bool>(), 8 * 5),
        no_licks in prop::collection::vec(any::<bool>(), 5),
        fewer in 0u8..16,
        extra in 0u8..16,
    ) {
        let session = session_from(&bits, 5, &no_licks);
        let narrow = good_trials(&session, &options(fewer | extra));
        let wide = good_trials(&session, &options(fewer));

        prop_assert!(narrow.len() <= wide.len());
        prop_assert!(narrow.iter().all(|t| wide.contains(t)));
        prop_assert_eq!(good_trials(&session, &FilterOptions::none()), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn table_has_one_record_per_epoch(
        bits in prop::collection::vec(any::<bool>(), 8 * 4),
    ) {
        let session = session_from(&bits, 4, &[]);
        prop_assert_eq!(session.trial_table().len(), session.epoch_ids().len());
        for record in session.trial_table() {
            prop_assert_eq!(round_time(record.pole_out_time), record.pole_out_time);
        }
    }
}
