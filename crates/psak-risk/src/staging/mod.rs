//! Staging-rule evaluation: assigns PSAK 71 stages to financing facilities
//! from an ordered, prioritized rule list, with a per-criterion trace so rule
//! authors can see why a transaction landed where it did.

pub mod criteria;
pub mod domain;
pub mod engine;
pub mod repository;
pub mod router;
pub mod service;
pub mod simulator;

#[cfg(test)]
mod tests;

pub use criteria::{matches, CriterionAnomaly, CriterionTrace};
pub use domain::{
    Criterion, CriterionOperator, CriterionValue, EvaluationContext, FieldValue, LogicOperator,
    StageType, StagingRule, TransactionProfile,
};
pub use engine::{
    evaluate, EvaluationStep, RuleSet, RuleSetError, StageAssignment, StagingError,
    StagingEvaluation,
};
pub use repository::{RepositoryError, RuleWrite, StagingRuleRepository};
pub use router::staging_router;
pub use service::{StagingAssessment, StagingService, StagingServiceError};
pub use simulator::{simulate, RuleHit, SimulatedOutcome, SimulationSummary, StageDistributionEntry};
