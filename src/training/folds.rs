//! Expanding-window cross-validation folds over time-ordered rows

use std::ops::Range;

/// Rows to fit on and rows to score, as index ranges into time-sorted data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Range<usize>,
    pub validation: Range<usize>,
}

/// Number of folds for `n` rows: 5 from 500 rows, otherwise `n / 50` clamped
/// to 2..=4, then bounded by the configured range
pub fn fold_count(n: usize, min_folds: usize, max_folds: usize) -> usize {
    let folds = if n >= 500 { 5 } else { (n / 50).clamp(2, 4) };
    folds.clamp(min_folds, max_folds.max(min_folds))
}

/// First index at or after `i` that starts a new (season, week)
fn snap_forward(keys: &[(i32, u32)], mut i: usize) -> usize {
    while i > 0 && i < keys.len() && keys[i] == keys[i - 1] {
        i += 1;
    }
    i
}

/// Expanding-window folds over rows sorted by `keys`.
///
/// Validation blocks have `n / (folds + 1)` rows and tile the tail of the
/// data; each fold trains on everything before its block. Block boundaries
/// are pushed forward to the next week change so no week is split between
/// training and validation. Folds left without validation or training rows
/// are dropped.
pub fn expanding_window_folds(keys: &[(i32, u32)], folds: usize) -> Vec<Fold> {
    let n = keys.len();
    let test_size = n / (folds + 1);
    if test_size == 0 {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(folds);
    for i in 0..folds {
        let start = snap_forward(keys, n - (folds - i) * test_size);
        let end = snap_forward(keys, (n - (folds - i - 1) * test_size).min(n));
        if start == 0 || start >= end {
            tracing::debug!(fold = i + 1, start, end, "Skipping fold without validation rows");
            continue;
        }
        result.push(Fold {
            train: 0..start,
            validation: start..end,
        });
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `weeks` weeks of `per_week` games each, in one season
    fn keys(weeks: u32, per_week: usize) -> Vec<(i32, u32)> {
        (1..=weeks)
            .flat_map(|w| std::iter::repeat((2024, w)).take(per_week))
            .collect()
    }

    #[test]
    fn test_fold_count() {
        assert_eq!(fold_count(520, 2, 5), 5);
        assert_eq!(fold_count(500, 2, 5), 5);
        assert_eq!(fold_count(499, 2, 5), 4);
        assert_eq!(fold_count(150, 2, 5), 3);
        assert_eq!(fold_count(90, 2, 5), 2);
        assert_eq!(fold_count(20, 2, 5), 2);
        assert_eq!(fold_count(520, 2, 3), 3);
        assert_eq!(fold_count(90, 3, 5), 3);
    }

    #[test]
    fn test_folds_without_ties() {
        let keys: Vec<(i32, u32)> = (1..=12).map(|w| (2024, w)).collect();
        let folds = expanding_window_folds(&keys, 3);
        assert_eq!(
            folds,
            vec![
                Fold { train: 0..3, validation: 3..6 },
                Fold { train: 0..6, validation: 6..9 },
                Fold { train: 0..9, validation: 9..12 },
            ]
        );
    }

    #[test]
    fn test_validation_never_precedes_training() {
        let keys = keys(18, 16);
        let n = keys.len();
        let folds = expanding_window_folds(&keys, fold_count(n, 2, 5));
        assert_eq!(folds.len(), 4);
        for fold in &folds {
            let last_train = keys[fold.train.end - 1];
            let first_valid = keys[fold.validation.start];
            assert!(last_train < first_valid, "{:?}", fold);
            assert_eq!(fold.train.start, 0);
        }
        assert_eq!(folds.last().unwrap().validation.end, n);
    }

    #[test]
    fn test_boundaries_snap_to_week_changes() {
        // 10 rows per week; 3 folds over 60 rows puts raw boundaries at 15, 30, 45
        let keys = keys(6, 10);
        let folds = expanding_window_folds(&keys, 3);
        assert_eq!(
            folds,
            vec![
                Fold { train: 0..20, validation: 20..30 },
                Fold { train: 0..30, validation: 30..50 },
                Fold { train: 0..50, validation: 50..60 },
            ]
        );
    }

    #[test]
    fn test_single_week_has_no_folds() {
        let keys = keys(1, 40);
        assert!(expanding_window_folds(&keys, 2).is_empty());
    }

    #[test]
    fn test_too_few_rows() {
        let keys = keys(2, 1);
        assert!(expanding_window_folds(&keys, 2).is_empty());
    }
}
