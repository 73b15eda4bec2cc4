//! One-dimensional peak detection.

use serde::{Deserialize, Serialize};

/// Parameters of [`find_peaks`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakOptions {
    /// Minimum peak height as a fraction of the signal's range (0..=1)
    pub threshold: f64,
    /// Minimum distance between kept peaks, in samples
    pub min_distance: usize,
}

impl Default for PeakOptions {
    fn default() -> Self {
        PeakOptions {
            threshold: 0.3,
            min_distance: 200,
        }
    }
}

/// Indices of the local maxima of `y`, ascending.
///
/// A sample is a peak when it is strictly above
/// `min + threshold * (max - min)` and the signal rises into it and falls
/// after it. On a flat top the part of the plateau before its median takes
/// the slope on its left and the rest the slope on its right, so the peak
/// lands on the plateau's centre, rounding down for an even-width top. Flat
/// runs touching either end of the signal take their one inner slope.
///
/// Peaks are then thinned from the highest down: every kept peak removes the
/// others within `min_distance` samples of it.
pub fn find_peaks(y: &[f64], options: &PeakOptions) -> Vec<usize> {
    if y.len() < 3 {
        return Vec::new();
    }

    let (min, max) = y
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let threshold = options.threshold * (max - min) + min;

    let mut dy: Vec<f64> = y.windows(2).map(|w| w[1] - w[0]).collect();
    if dy.iter().all(|&d| d == 0.0) {
        return Vec::new();
    }
    fill_plateaus(&mut dy);

    let n = y.len();
    let mut peaks: Vec<usize> = (1..n - 1)
        .filter(|&i| dy[i - 1] > 0.0 && dy[i] < 0.0 && y[i] > threshold)
        .collect();

    if peaks.len() > 1 && options.min_distance > 1 {
        peaks = thin_peaks(y, &peaks, options.min_distance);
    }
    peaks
}

/// Replaces zero differences with the slope of the nearest non-flat
/// neighbour.
fn fill_plateaus(dy: &mut [f64]) {
    let n = dy.len();
    let mut i = 0;
    while i < n {
        if dy[i] != 0.0 {
            i += 1;
            continue;
        }
        let start = i;
        while i < n && dy[i] == 0.0 {
            i += 1;
        }
        let end = i; // exclusive

        match (start == 0, end == n) {
            (true, true) => return,
            (true, false) => {
                let fill = dy[end];
                dy[start..end].iter_mut().for_each(|d| *d = fill);
            }
            (false, true) => {
                let fill = dy[start - 1];
                dy[start..end].iter_mut().for_each(|d| *d = fill);
            }
            (false, false) => {
                let (left, right) = (dy[start - 1], dy[end]);
                // Twice the median, to stay in integers
                let median2 = start + end - 1;
                for (k, d) in dy.iter_mut().enumerate().take(end).skip(start) {
                    *d = if 2 * k < median2 { left } else { right };
                }
            }
        }
    }
}

fn thin_peaks(y: &[f64], peaks: &[usize], min_distance: usize) -> Vec<usize> {
    let mut by_height = peaks.to_vec();
    // Highest first; among equals the later index first
    by_height.sort_by(|&a, &b| y[b].total_cmp(&y[a]).then(b.cmp(&a)));

    let mut removed = vec![true; y.len()];
    for &p in peaks {
        removed[p] = false;
    }
    for &p in &by_height {
        if !removed[p] {
            let lo = p.saturating_sub(min_distance);
            let hi = (p + min_distance + 1).min(y.len());
            removed[lo..hi].iter_mut().for_each(|r| *r = true);
            removed[p] = false;
        }
    }

    (0..y.len()).filter(|&i| !removed[i]).collect()
}
