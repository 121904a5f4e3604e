use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{CollectibilityState, MatrixPeriod, MigrationMatrixEntry};

/// Allowed deviation of a row's probability mass from 1.0.
pub const ROW_SUM_TOLERANCE: f64 = 0.01;

// Absorbs binary rounding so a row summing to exactly 1 ± tolerance passes.
const FLOAT_SLACK: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSum {
    pub from_state: CollectibilityState,
    pub sum: f64,
    pub entries: usize,
}

/// A `from_state` whose outgoing probabilities do not sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowImbalance {
    pub from_state: CollectibilityState,
    pub actual_sum: f64,
}

/// Row-sum check for one period of a migration matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixValidation {
    pub period: MatrixPeriod,
    pub tolerance: f64,
    pub rows: Vec<RowSum>,
    pub imbalances: Vec<RowImbalance>,
}

impl MatrixValidation {
    pub fn is_valid(&self) -> bool {
        self.imbalances.is_empty()
    }
}

/// Check that every `from_state` present in the period sums to 1.0 within
/// [`ROW_SUM_TOLERANCE`]. States with no entries are not reported.
pub fn validate(
    entries: &[MigrationMatrixEntry],
    period: &MatrixPeriod,
) -> MatrixValidation {
    validate_with_tolerance(entries, period, ROW_SUM_TOLERANCE)
}

pub fn validate_with_tolerance(
    entries: &[MigrationMatrixEntry],
    period: &MatrixPeriod,
    tolerance: f64,
) -> MatrixValidation {
    let mut sums: BTreeMap<CollectibilityState, (f64, usize)> = BTreeMap::new();
    for entry in entries.iter().filter(|entry| entry.belongs_to(period)) {
        let row = sums.entry(entry.from_state).or_insert((0.0, 0));
        row.0 += entry.probability;
        row.1 += 1;
    }

    let rows: Vec<RowSum> = sums
        .into_iter()
        .map(|(from_state, (sum, entries))| RowSum {
            from_state,
            sum,
            entries,
        })
        .collect();

    let imbalances = rows
        .iter()
        .filter(|row| !row_balanced(row.sum, tolerance))
        .map(|row| RowImbalance {
            from_state: row.from_state,
            actual_sum: row.sum,
        })
        .collect();

    MatrixValidation {
        period: *period,
        tolerance,
        rows,
        imbalances,
    }
}

pub(crate) fn row_balanced(sum: f64, tolerance: f64) -> bool {
    sum.is_finite() && (sum - 1.0).abs() <= tolerance + FLOAT_SLACK
}
