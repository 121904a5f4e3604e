use serde::{Deserialize, Serialize};

use super::domain::{CollectibilityState, MatrixPeriod, MigrationMatrixEntry, TransitionObservation};
use super::validation::{validate_with_tolerance, RowImbalance, ROW_SUM_TOLERANCE};

/// Stay probability used when operators start a new matrix from scratch.
pub const DEFAULT_STAY_PROBABILITY: f64 = 0.8;

/// Longest default curve, in periods, that `default_term_structure` builds.
pub const MAX_CURVE_HORIZON: u32 = 600;

const STATES: usize = CollectibilityState::COUNT;

type Cells = [[f64; STATES]; STATES];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MigrationError {
    #[error("migration matrix for {period} has unbalanced rows: {}", describe_imbalances(.imbalances))]
    RowImbalance {
        period: MatrixPeriod,
        imbalances: Vec<RowImbalance>,
    },
    #[error("migration matrix for {period} has no rows for states {missing:?}")]
    IncompleteMatrix {
        period: MatrixPeriod,
        missing: Vec<CollectibilityState>,
    },
    #[error("probability {probability} for {from} -> {to} must be within [0, 1]")]
    InvalidProbability {
        from: CollectibilityState,
        to: CollectibilityState,
        probability: f64,
    },
    #[error("duplicate entry for {from} -> {to} in {period}")]
    DuplicateEntry {
        period: MatrixPeriod,
        from: CollectibilityState,
        to: CollectibilityState,
    },
    #[error("period start {} is after period end {}", .0.period_start, .0.period_end)]
    InvalidPeriod(MatrixPeriod),
    #[error("stay probability {0} must be within [0, 1]")]
    InvalidStayProbability(f64),
    #[error("no transition observations recorded for {0}")]
    NoObservations(MatrixPeriod),
    #[error("curve horizon {requested} exceeds the maximum of {max} periods")]
    HorizonTooLong { requested: u32, max: u32 },
}

fn describe_imbalances(imbalances: &[RowImbalance]) -> String {
    imbalances
        .iter()
        .map(|row| format!("state {} sums to {:.4}", row.from_state, row.actual_sum))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Probability of moving `from` → `to` in `entries`; an absent pair means zero.
///
/// Entries are not filtered by period, so callers holding several periods
/// should narrow the slice first.
pub fn lookup(
    entries: &[MigrationMatrixEntry],
    from: CollectibilityState,
    to: CollectibilityState,
) -> f64 {
    entries
        .iter()
        .find(|entry| entry.from_state == from && entry.to_state == to)
        .map(|entry| entry.probability)
        .unwrap_or(0.0)
}

/// Balanced starting matrix: `stay_probability` on the diagonal, the rest
/// spread over other states with weight halving per step of distance.
pub fn build_default_matrix(
    period: MatrixPeriod,
    stay_probability: f64,
) -> Result<MigrationMatrix, MigrationError> {
    if !period.is_ordered() {
        return Err(MigrationError::InvalidPeriod(period));
    }
    if !stay_probability.is_finite() || !(0.0..=1.0).contains(&stay_probability) {
        return Err(MigrationError::InvalidStayProbability(stay_probability));
    }

    let mut cells: Cells = [[0.0; STATES]; STATES];
    for (from, row) in cells.iter_mut().enumerate() {
        let weights: Vec<f64> = (0..STATES)
            .map(|to| {
                if to == from {
                    0.0
                } else {
                    0.5_f64.powi(from.abs_diff(to) as i32 - 1)
                }
            })
            .collect();
        let total_weight: f64 = weights.iter().sum();
        let off_diagonal = 1.0 - stay_probability;

        for (to, cell) in row.iter_mut().enumerate() {
            *cell = if to == from {
                stay_probability
            } else {
                off_diagonal * weights[to] / total_weight
            };
        }

        let sum: f64 = row.iter().sum();
        for cell in row.iter_mut() {
            *cell /= sum;
        }
    }

    Ok(MigrationMatrix { period, cells })
}

/// Validated 5×5 transition matrix for one period.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationMatrix {
    period: MatrixPeriod,
    cells: Cells,
}

/// Portfolio-level movement indicators shown alongside a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixStatistics {
    pub average_stay: f64,
    pub average_downgrade: f64,
    pub average_upgrade: f64,
    pub default_transition: f64,
}

/// Matrix estimated from historical observations.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatedMatrix {
    pub matrix: MigrationMatrix,
    pub observations_used: usize,
    pub unobserved_states: Vec<CollectibilityState>,
}

impl MigrationMatrix {
    pub fn from_entries(
        entries: &[MigrationMatrixEntry],
        period: MatrixPeriod,
    ) -> Result<Self, MigrationError> {
        Self::from_entries_with_tolerance(entries, period, ROW_SUM_TOLERANCE)
    }

    /// Build the matrix for `period`, rejecting unbalanced or incomplete rows
    /// rather than renormalizing them.
    pub fn from_entries_with_tolerance(
        entries: &[MigrationMatrixEntry],
        period: MatrixPeriod,
        tolerance: f64,
    ) -> Result<Self, MigrationError> {
        if !period.is_ordered() {
            return Err(MigrationError::InvalidPeriod(period));
        }

        let mut cells: Cells = [[0.0; STATES]; STATES];
        let mut seen = [[false; STATES]; STATES];
        let mut present = [false; STATES];

        for entry in entries.iter().filter(|entry| entry.belongs_to(&period)) {
            let (from, to) = (entry.from_state.index(), entry.to_state.index());
            if !entry.probability.is_finite() || !(0.0..=1.0).contains(&entry.probability) {
                return Err(MigrationError::InvalidProbability {
                    from: entry.from_state,
                    to: entry.to_state,
                    probability: entry.probability,
                });
            }
            if seen[from][to] {
                return Err(MigrationError::DuplicateEntry {
                    period,
                    from: entry.from_state,
                    to: entry.to_state,
                });
            }
            seen[from][to] = true;
            present[from] = true;
            cells[from][to] = entry.probability;
        }

        let validation = validate_with_tolerance(entries, &period, tolerance);
        if !validation.is_valid() {
            return Err(MigrationError::RowImbalance {
                period,
                imbalances: validation.imbalances,
            });
        }

        let missing: Vec<CollectibilityState> = CollectibilityState::ordered()
            .into_iter()
            .filter(|state| !present[state.index()])
            .collect();
        if !missing.is_empty() {
            return Err(MigrationError::IncompleteMatrix { period, missing });
        }

        Ok(Self { period, cells })
    }

    /// Count-based estimate: each row is the observed share of facilities
    /// moving to each state. States never observed as a starting point keep
    /// their facilities in place.
    pub fn from_observations(
        observations: &[TransitionObservation],
        period: MatrixPeriod,
    ) -> Result<EstimatedMatrix, MigrationError> {
        if !period.is_ordered() {
            return Err(MigrationError::InvalidPeriod(period));
        }

        let mut counts = [[0usize; STATES]; STATES];
        let mut observations_used = 0;
        for observation in observations
            .iter()
            .filter(|observation| observation.belongs_to(&period))
        {
            counts[observation.from_state.index()][observation.to_state.index()] += 1;
            observations_used += 1;
        }

        if observations_used == 0 {
            return Err(MigrationError::NoObservations(period));
        }

        let mut cells: Cells = [[0.0; STATES]; STATES];
        let mut unobserved_states = Vec::new();
        for state in CollectibilityState::ordered() {
            let from = state.index();
            let total: usize = counts[from].iter().sum();
            if total == 0 {
                cells[from][from] = 1.0;
                unobserved_states.push(state);
                continue;
            }
            for to in 0..STATES {
                cells[from][to] = counts[from][to] as f64 / total as f64;
            }
        }

        Ok(EstimatedMatrix {
            matrix: Self { period, cells },
            observations_used,
            unobserved_states,
        })
    }

    pub fn period(&self) -> MatrixPeriod {
        self.period
    }

    pub fn probability(&self, from: CollectibilityState, to: CollectibilityState) -> f64 {
        self.cells[from.index()][to.index()]
    }

    pub fn row(&self, from: CollectibilityState) -> [f64; STATES] {
        self.cells[from.index()]
    }

    pub fn to_entries(&self) -> Vec<MigrationMatrixEntry> {
        let mut entries = Vec::with_capacity(STATES * STATES);
        for from in CollectibilityState::ordered() {
            for to in CollectibilityState::ordered() {
                entries.push(MigrationMatrixEntry {
                    period_start: self.period.period_start,
                    period_end: self.period.period_end,
                    from_state: from,
                    to_state: to,
                    probability: self.probability(from, to),
                });
            }
        }
        entries
    }

    pub fn statistics(&self) -> MatrixStatistics {
        let states = CollectibilityState::ordered();
        let average_stay =
            states.iter().map(|state| self.probability(*state, *state)).sum::<f64>()
                / STATES as f64;

        let downgrade_rows = &states[..STATES - 1];
        let average_downgrade = downgrade_rows
            .iter()
            .map(|from| {
                states
                    .iter()
                    .filter(|to| to.index() > from.index())
                    .map(|to| self.probability(*from, *to))
                    .sum::<f64>()
            })
            .sum::<f64>()
            / downgrade_rows.len() as f64;

        let upgrade_rows = &states[1..];
        let average_upgrade = upgrade_rows
            .iter()
            .map(|from| {
                states
                    .iter()
                    .filter(|to| to.index() < from.index())
                    .map(|to| self.probability(*from, *to))
                    .sum::<f64>()
            })
            .sum::<f64>()
            / upgrade_rows.len() as f64;

        let default_transition = downgrade_rows
            .iter()
            .map(|from| self.probability(*from, CollectibilityState::Loss))
            .sum::<f64>()
            / downgrade_rows.len() as f64;

        MatrixStatistics {
            average_stay,
            average_downgrade,
            average_upgrade,
            default_transition,
        }
    }

    /// Probability that a facility starting in `from` sits in state 5 after
    /// `periods` applications of this matrix.
    pub fn cumulative_default_probability(&self, from: CollectibilityState, periods: u32) -> f64 {
        let mut distribution = start_distribution(from);
        for _ in 0..periods {
            distribution = self.step(&distribution);
        }
        distribution[CollectibilityState::Loss.index()]
    }

    /// Default curve for each starting state over `1..=horizon` periods.
    pub fn default_term_structure(
        &self,
        horizon: u32,
    ) -> Result<Vec<DefaultCurve>, MigrationError> {
        if horizon > MAX_CURVE_HORIZON {
            return Err(MigrationError::HorizonTooLong {
                requested: horizon,
                max: MAX_CURVE_HORIZON,
            });
        }

        Ok(CollectibilityState::ordered()
            .into_iter()
            .map(|state| {
                let mut distribution = start_distribution(state);
                let mut cumulative = Vec::with_capacity(horizon as usize);
                for _ in 0..horizon {
                    distribution = self.step(&distribution);
                    cumulative.push(distribution[CollectibilityState::Loss.index()]);
                }
                DefaultCurve {
                    from_state: state,
                    cumulative,
                }
            })
            .collect())
    }

    fn step(&self, distribution: &[f64; STATES]) -> [f64; STATES] {
        let mut next = [0.0; STATES];
        for (i, mass) in distribution.iter().enumerate() {
            if *mass == 0.0 {
                continue;
            }
            for (j, slot) in next.iter_mut().enumerate() {
                *slot += mass * self.cells[i][j];
            }
        }
        next
    }
}

fn start_distribution(from: CollectibilityState) -> [f64; STATES] {
    let mut distribution = [0.0; STATES];
    distribution[from.index()] = 1.0;
    distribution
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultCurve {
    pub from_state: CollectibilityState,
    pub cumulative: Vec<f64>,
}
