use serde::{Deserialize, Serialize};

use super::domain::StagingRule;

/// Storage abstraction for the rule editor's working copy so the service can
/// be exercised in isolation.
pub trait StagingRuleRepository: Send + Sync {
    fn list(&self) -> Result<Vec<StagingRule>, RepositoryError>;
    fn fetch(&self, rule_id: &str) -> Result<Option<StagingRule>, RepositoryError>;
    fn upsert(&self, rule: StagingRule) -> Result<RuleWrite, RepositoryError>;
    fn remove(&self, rule_id: &str) -> Result<StagingRule, RepositoryError>;
}

/// Whether an upsert created a new rule or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleWrite {
    Created,
    Updated,
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("rule not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
