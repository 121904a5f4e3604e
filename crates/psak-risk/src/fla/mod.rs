//! Forward-looking adjustment: scenario-weighted PD/LGD with per-segment
//! factors and optional macro-variable correlation shocks.

pub mod adjuster;
pub mod domain;

pub use adjuster::{
    compute_weighted, AdjustmentError, AdjustmentWarning, FactorSource, ScenarioAdjuster,
    ScenarioResult, WeightedAdjustment, SCENARIO_PROBABILITY_TOLERANCE,
};
pub use domain::{
    AdjustmentRequest, AdvancedAdjustment, CustomVariableAdjustment, EconomicScenario,
    ProbabilityPolicy, RiskMetric, ScenarioAdjustment, ScenarioType, VariableCorrelation,
    ALL_SEGMENTS,
};
