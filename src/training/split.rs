//! Seeded stratified train/held-out split.

use crate::error::{AppError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Row indices of each subset, ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Perform a stratified split preserving each label's proportion.
///
/// Every label contributes `round(n * test_ratio)` rows to the held-out
/// subset, clamped so that both subsets receive at least one row of it.
pub fn stratified_split<L: Ord>(labels: &[L], test_ratio: f64, seed: u64) -> Result<Split> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(AppError::Training(format!(
            "test ratio must be in (0, 1), got {}",
            test_ratio
        )));
    }

    let mut groups: BTreeMap<&L, Vec<usize>> = BTreeMap::new();
    for (idx, label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(idx);
    }

    if groups.len() < 2 {
        return Err(AppError::Training(format!(
            "need at least 2 distinct labels to split, found {}",
            groups.len()
        )));
    }

    if let Some(smallest) = groups.values().map(Vec::len).min() {
        if smallest < 2 {
            return Err(AppError::Training(
                "the least populated label has only 1 row; every label needs at least 2 \
                 for a stratified split"
                    .to_string(),
            ));
        }
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for indices in groups.values_mut() {
        indices.shuffle(&mut rng);
        let n = indices.len();
        let n_test = ((n as f64 * test_ratio).round() as usize).clamp(1, n - 1);
        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();

    tracing::debug!(train = train.len(), test = test.len(), "Stratified split");

    Ok(Split { train, test })
}
