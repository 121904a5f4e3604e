use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::staging::domain::{
    Criterion, CriterionOperator, CriterionValue, EvaluationContext, StageType, StagingRule,
    TransactionProfile,
};
use crate::staging::repository::{RepositoryError, RuleWrite, StagingRuleRepository};
use crate::staging::{staging_router, StagingService};

/// DPD ladder used throughout the scenarios: >90 → Stage 3, >30 → Stage 2,
/// catch-all → Stage 1.
pub(super) fn dpd_rules() -> Vec<StagingRule> {
    vec![
        StagingRule::new("dpd-90", "DPD above 90", StageType::Stage3, 1).with_criterion(
            Criterion::new("dpd", CriterionOperator::GreaterThan, 90),
        ),
        StagingRule::new("dpd-30", "DPD above 30", StageType::Stage2, 2).with_criterion(
            Criterion::new("dpd", CriterionOperator::GreaterThan, 30),
        ),
        default_rule(),
    ]
}

pub(super) fn default_rule() -> StagingRule {
    StagingRule::new("performing", "Performing", StageType::Stage1, 999)
}

/// Rule book closer to what credit-risk teams maintain: impairment on
/// collectibility, SICR via PD deterioration or qualitative flags.
pub(super) fn sicr_rules() -> Vec<StagingRule> {
    vec![
        StagingRule::new("impaired", "Collectibility 3-5", StageType::Stage3, 10).with_criterion(
            Criterion::new(
                "collectibility",
                CriterionOperator::In,
                CriterionValue::list(["3", "4", "5"]),
            ),
        ),
        StagingRule::new("sicr-pd", "PD increase with watchlist", StageType::Stage2, 20)
            .with_criterion(Criterion::new(
                "pd_increase_pct",
                CriterionOperator::GreaterThan,
                100,
            ))
            .with_criterion(Criterion::new("watchlist", CriterionOperator::Equals, true).or()),
        StagingRule::new("restructured", "Restructured facility", StageType::Stage2, 30)
            .with_criterion(Criterion::new(
                "restructured",
                CriterionOperator::Equals,
                true,
            ))
            .with_criterion(
                Criterion::new("industry_outlook", CriterionOperator::Contains, "Negative").and(),
            ),
        default_rule(),
    ]
}

pub(super) fn transaction(id: &str, dpd: i32) -> TransactionProfile {
    TransactionProfile {
        transaction_id: id.to_string(),
        attributes: EvaluationContext::new().with("dpd", dpd),
    }
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    rules: Mutex<Vec<StagingRule>>,
}

impl MemoryRepository {
    pub(super) fn with_rules(rules: Vec<StagingRule>) -> Self {
        let repository = Self::default();
        for rule in rules {
            repository.upsert(rule).expect("seed rule");
        }
        repository
    }
}

impl StagingRuleRepository for MemoryRepository {
    fn list(&self) -> Result<Vec<StagingRule>, RepositoryError> {
        let guard = self.rules.lock().expect("repository mutex poisoned");
        Ok(guard.clone())
    }

    fn fetch(&self, rule_id: &str) -> Result<Option<StagingRule>, RepositoryError> {
        let guard = self.rules.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|rule| rule.id == rule_id).cloned())
    }

    fn upsert(&self, rule: StagingRule) -> Result<RuleWrite, RepositoryError> {
        let mut guard = self.rules.lock().expect("repository mutex poisoned");
        match guard.iter_mut().find(|existing| existing.id == rule.id) {
            Some(existing) => {
                *existing = rule;
                Ok(RuleWrite::Updated)
            }
            None => {
                guard.push(rule);
                Ok(RuleWrite::Created)
            }
        }
    }

    fn remove(&self, rule_id: &str) -> Result<StagingRule, RepositoryError> {
        let mut guard = self.rules.lock().expect("repository mutex poisoned");
        let position = guard
            .iter()
            .position(|rule| rule.id == rule_id)
            .ok_or(RepositoryError::NotFound)?;
        Ok(guard.remove(position))
    }
}

pub(super) struct UnavailableRepository;

impl StagingRuleRepository for UnavailableRepository {
    fn list(&self) -> Result<Vec<StagingRule>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn fetch(&self, _rule_id: &str) -> Result<Option<StagingRule>, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn upsert(&self, _rule: StagingRule) -> Result<RuleWrite, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }

    fn remove(&self, _rule_id: &str) -> Result<StagingRule, RepositoryError> {
        Err(RepositoryError::Unavailable("offline".to_string()))
    }
}

pub(super) fn service_with_rules(
    rules: Vec<StagingRule>,
) -> (Arc<StagingService<MemoryRepository>>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::with_rules(rules));
    let service = Arc::new(StagingService::new(repository.clone()));
    (service, repository)
}

pub(super) fn router_with_rules(rules: Vec<StagingRule>) -> axum::Router {
    let (service, _) = service_with_rules(rules);
    staging_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}
