//! Collectibility migration matrices: validation of operator-entered
//! transition tables, default starting matrices, estimation from historical
//! movements and multi-period default estimates.

pub mod domain;
pub mod matrix;
pub mod observations;
pub mod validation;

pub use domain::{CollectibilityState, MatrixPeriod, MigrationMatrixEntry, TransitionObservation};
pub use matrix::{
    build_default_matrix, lookup, DefaultCurve, EstimatedMatrix, MatrixStatistics,
    MigrationError, MigrationMatrix, DEFAULT_STAY_PROBABILITY, MAX_CURVE_HORIZON,
};
pub use observations::{observations_from_path, parse_observations, ObservationImportError};
pub use validation::{
    validate, validate_with_tolerance, MatrixValidation, RowImbalance, RowSum, ROW_SUM_TOLERANCE,
};
