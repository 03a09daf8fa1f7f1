//! Gap filling by expanding-square search.
//!
//! For every missing reference cell the resolver scans square neighbourhoods
//! of growing radius around it. Each radius rescans the whole
//! `(2r + 1) x (2r + 1)` block in row-major offset order and the first valid
//! reference cell found donates its value. The result is therefore the first
//! hit in scan order at the smallest successful radius, which is not always the
//! Euclidean-nearest candidate.
//!
//! Fills are computed against the series as it was before the pass and only
//! applied once every lookup has finished, so a freshly filled cell never feeds
//! another fill in the same pass.

use rayon::prelude::*;
use serde::Serialize;

use crate::grid::Grid;
use crate::series::{ReferenceIndex, ValueSeries};

/// Outcome counts of one resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveStats {
    /// Entries that were missing before the pass
    pub missing: usize,
    /// Entries that received a value
    pub filled: usize,
    /// Entries left missing because no valid neighbour exists
    pub unresolved: usize,
}

/// Fill the missing entries of `series` in place.
///
/// `series` must be aligned with `reference`. Present values are never
/// modified, so running the resolver on a complete series is a no-op.
pub fn resolve_missing(
    series: &mut ValueSeries,
    grid: &Grid,
    reference: &ReferenceIndex,
) -> ResolveStats {
    let snapshot = series.values();
    let gaps: Vec<usize> = snapshot
        .iter()
        .enumerate()
        .filter(|(_, value)| value.is_none())
        .map(|(position, _)| position)
        .collect();

    let fills: Vec<(usize, Option<f64>)> = gaps
        .par_iter()
        .map(|&position| {
            let index = reference.indices()[position];
            (position, find_replacement(index, grid, reference, snapshot))
        })
        .collect();

    let mut stats = ResolveStats {
        missing: gaps.len(),
        ..Default::default()
    };

    let values = series.values_mut();
    for (position, fill) in fills {
        match fill {
            Some(value) => {
                values[position] = Some(value);
                stats.filled += 1;
            }
            None => stats.unresolved += 1,
        }
    }

    stats
}

/// Search outward from flat `index` for the first valid reference value.
///
/// `values` is aligned with `reference`. Returns `None` when no radius up to
/// [`Grid::max_radius`] holds a candidate.
pub fn find_replacement(
    index: usize,
    grid: &Grid,
    reference: &ReferenceIndex,
    values: &[Option<f64>],
) -> Option<f64> {
    let (row, col) = grid.to_row_col(index);
    let (row, col) = (row as i64, col as i64);

    for radius in 1..=grid.max_radius() as i64 {
        for di in -radius..=radius {
            for dj in -radius..=radius {
                let (nr, nc) = (row + di, col + dj);
                if !grid.in_bounds(nr, nc) {
                    continue;
                }
                let candidate = grid.to_index(nr as usize, nc as usize);
                if candidate == index {
                    continue;
                }
                let value = reference
                    .position(candidate)
                    .and_then(|position| values.get(position).copied().flatten());
                if value.is_some() {
                    return value;
                }
            }
        }
    }

    None
}
