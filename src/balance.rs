//! Class balancing and stratified splitting
//!
//! Both operations are seeded so the same seed always yields the same rows.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::sentiment::{NUM_CLASSES, Sentiment};

/// Random oversampler. Every minority class is resampled with replacement up
/// to the size of the largest class; the largest class is left untouched.
#[derive(Debug, Clone)]
pub struct ClassBalancer {
    seed: u64,
}

impl ClassBalancer {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Returns the balanced rows grouped by label code: all negative rows,
    /// then positive, then neutral.
    pub fn resample<T: Clone>(&self, rows: Vec<(T, Sentiment)>) -> Vec<(T, Sentiment)> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let groups = group_by_label(rows);
        let target = groups.iter().map(Vec::len).max().unwrap_or(0);

        let mut balanced = Vec::with_capacity(target * NUM_CLASSES);
        for (label, group) in Sentiment::ALL.into_iter().zip(groups) {
            if group.is_empty() {
                continue;
            }
            let n_extra = target - group.len();
            let extra: Vec<T> = (0..n_extra)
                .map(|_| group[rng.random_range(0..group.len())].clone())
                .collect();
            balanced.extend(group.into_iter().chain(extra).map(|row| (row, label)));
        }
        balanced
    }
}

/// Per-class row counts, indexed by label code.
pub fn class_counts<T>(rows: &[(T, Sentiment)]) -> [usize; NUM_CLASSES] {
    let mut counts = [0; NUM_CLASSES];
    for (_, label) in rows {
        counts[label.index()] += 1;
    }
    counts
}

fn group_by_label<T>(rows: Vec<(T, Sentiment)>) -> Vec<Vec<T>> {
    let mut groups: Vec<Vec<T>> = (0..NUM_CLASSES).map(|_| Vec::new()).collect();
    for (row, label) in rows {
        groups[label.index()].push(row);
    }
    groups
}

/// Splits rows into `(train, test)` keeping each class's proportion.
/// Each class contributes `round(n * test_size)` rows to the test split, but
/// always leaves at least one row for training.
pub fn stratified_split<T>(
    rows: Vec<(T, Sentiment)>,
    test_size: f64,
    seed: u64,
) -> (Vec<(T, Sentiment)>, Vec<(T, Sentiment)>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for (label, mut group) in Sentiment::ALL.into_iter().zip(group_by_label(rows)) {
        group.shuffle(&mut rng);
        let n = group.len();
        let n_test = ((n as f64 * test_size).round() as usize).min(n.saturating_sub(1));
        let rest = group.split_off(n_test);
        test.extend(group.into_iter().map(|row| (row, label)));
        train.extend(rest.into_iter().map(|row| (row, label)));
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    (train, test)
}
