//! Randomized train/test split.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::{Table, TableError};

/// Number of test rows for `n_rows` samples: `ceil(test_size * n_rows)`.
#[must_use]
pub fn test_row_count(n_rows: usize, test_size: f64) -> usize {
    ((test_size * n_rows as f64).ceil() as usize).min(n_rows)
}

/// Shuffles the rows and splits them into `(train, test)`.
///
/// `seed` makes the shuffle reproducible; `None` seeds from the OS.
///
/// # Errors
///
/// Returns an error if `test_size` is outside `(0, 1)` or either side would
/// end up empty.
pub fn train_test_split(
    table: &Table,
    test_size: f64,
    seed: Option<u64>,
) -> Result<(Table, Table), TableError> {
    let n_rows = table.n_rows();
    let n_test = test_row_count(n_rows, test_size);

    if !(test_size > 0.0 && test_size < 1.0) || n_test == 0 || n_test >= n_rows {
        return Err(TableError::InvalidSplit {
            rows: n_rows,
            test_size,
        });
    }

    let mut rng = match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };

    let mut indices: Vec<usize> = (0..n_rows).collect();
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    Ok((table.take_rows(train_idx), table.take_rows(test_idx)))
}
