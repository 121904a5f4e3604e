use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::domain::{StageType, StagingRule, TransactionProfile};
use super::engine::{EvaluationStep, RuleSet, RuleSetError, StagingError};
use super::repository::{RepositoryError, RuleWrite, StagingRuleRepository};
use super::simulator::{simulate, SimulationSummary};

/// Service composing the rule repository with the staging engine.
pub struct StagingService<R> {
    repository: Arc<R>,
}

/// Stage decision returned to callers of the assessment screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagingAssessment {
    pub transaction_id: String,
    pub stage: StageType,
    pub stage_label: &'static str,
    pub stage_description: &'static str,
    pub rule_id: String,
    pub rule_name: String,
    pub trace: Vec<EvaluationStep>,
}

impl<R> StagingService<R>
where
    R: StagingRuleRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// All stored rules, active or not, in evaluation order.
    pub fn rules(&self) -> Result<Vec<StagingRule>, StagingServiceError> {
        let mut rules = self.repository.list()?;
        rules.sort_by_key(|rule| rule.priority);
        Ok(rules)
    }

    pub fn save_rule(&self, rule: StagingRule) -> Result<RuleWrite, StagingServiceError> {
        if rule.id.trim().is_empty() {
            return Err(StagingServiceError::InvalidRule(
                "rule id must not be empty".to_string(),
            ));
        }
        if rule.name.trim().is_empty() {
            return Err(StagingServiceError::InvalidRule(format!(
                "rule '{}' must have a name",
                rule.id
            )));
        }
        if let Some(criterion) = rule
            .criteria
            .iter()
            .find(|criterion| criterion.field.trim().is_empty())
        {
            return Err(StagingServiceError::InvalidRule(format!(
                "rule '{}' has a criterion without a field (operator {})",
                rule.id, criterion.operator
            )));
        }

        let write = self.repository.upsert(rule)?;
        Ok(write)
    }

    pub fn set_active(
        &self,
        rule_id: &str,
        is_active: bool,
    ) -> Result<StagingRule, StagingServiceError> {
        let mut rule = self
            .repository
            .fetch(rule_id)?
            .ok_or(RepositoryError::NotFound)?;
        rule.is_active = is_active;
        self.repository.upsert(rule.clone())?;
        Ok(rule)
    }

    pub fn remove_rule(&self, rule_id: &str) -> Result<StagingRule, StagingServiceError> {
        Ok(self.repository.remove(rule_id)?)
    }

    /// Validated snapshot of the stored rules.
    pub fn rule_set(&self) -> Result<RuleSet, StagingServiceError> {
        let rules = self.repository.list()?;
        RuleSet::new(rules).map_err(|err| {
            warn!(error = %err, "stored staging rules failed validation");
            StagingServiceError::RuleSet(err)
        })
    }

    /// Assign a stage to one transaction using the stored rules.
    pub fn assess(
        &self,
        transaction: &TransactionProfile,
    ) -> Result<StagingAssessment, StagingServiceError> {
        let rule_set = self.rule_set()?;
        let assignment = rule_set
            .assign(&transaction.attributes)
            .inspect_err(|err| {
                warn!(transaction_id = %transaction.transaction_id, error = %err, "stage unassigned");
            })?;

        debug!(
            transaction_id = %transaction.transaction_id,
            stage = %assignment.stage,
            rule_id = %assignment.rule.id,
            "transaction staged"
        );

        Ok(StagingAssessment {
            transaction_id: transaction.transaction_id.clone(),
            stage: assignment.stage,
            stage_label: assignment.stage.label(),
            stage_description: assignment.stage.description(),
            rule_id: assignment.rule.id,
            rule_name: assignment.rule.name,
            trace: assignment.trace,
        })
    }

    /// Run the stored rules, as drafted, over a batch of transactions.
    pub fn simulate(
        &self,
        transactions: &[TransactionProfile],
    ) -> Result<SimulationSummary, StagingServiceError> {
        let rules = self.repository.list()?;
        let summary = simulate(&rules, transactions);
        if !summary.unassigned.is_empty() {
            warn!(
                unassigned = summary.unassigned.len(),
                total = summary.total,
                "simulation left transactions without a stage"
            );
        }
        Ok(summary)
    }
}

/// Error raised by the staging service.
#[derive(Debug, thiserror::Error)]
pub enum StagingServiceError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    RuleSet(#[from] RuleSetError),
    #[error(transparent)]
    Staging(#[from] StagingError),
    #[error("invalid rule: {0}")]
    InvalidRule(String),
}
