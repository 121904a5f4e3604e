use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use psak_risk::config::EngineConfig;
use psak_risk::error::AppError;
use psak_risk::fla::{EconomicScenario, ScenarioAdjustment, ScenarioType, ALL_SEGMENTS};
use psak_risk::staging::{
    Criterion, CriterionOperator, CriterionValue, RepositoryError, RuleWrite, StageType,
    StagingRule, StagingRuleRepository,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) engine: EngineConfig,
}

/// Per-process working copy of the rule editor's rules, kept in the order
/// they were first written.
#[derive(Default, Clone)]
pub(crate) struct InMemoryRuleRepository {
    rules: Arc<Mutex<Vec<StagingRule>>>,
}

impl InMemoryRuleRepository {
    pub(crate) fn with_rules(rules: Vec<StagingRule>) -> Self {
        let mut store: Vec<StagingRule> = Vec::with_capacity(rules.len());
        for rule in rules {
            write_rule(&mut store, rule);
        }
        Self {
            rules: Arc::new(Mutex::new(store)),
        }
    }

    fn guard(&self) -> Result<MutexGuard<'_, Vec<StagingRule>>, RepositoryError> {
        self.rules
            .lock()
            .map_err(|_| RepositoryError::Unavailable("rule store lock poisoned".to_string()))
    }
}

fn write_rule(store: &mut Vec<StagingRule>, rule: StagingRule) -> RuleWrite {
    match store.iter_mut().find(|existing| existing.id == rule.id) {
        Some(existing) => {
            *existing = rule;
            RuleWrite::Updated
        }
        None => {
            store.push(rule);
            RuleWrite::Created
        }
    }
}

impl StagingRuleRepository for InMemoryRuleRepository {
    fn list(&self) -> Result<Vec<StagingRule>, RepositoryError> {
        Ok(self.guard()?.clone())
    }

    fn fetch(&self, rule_id: &str) -> Result<Option<StagingRule>, RepositoryError> {
        Ok(self.guard()?.iter().find(|rule| rule.id == rule_id).cloned())
    }

    fn upsert(&self, rule: StagingRule) -> Result<RuleWrite, RepositoryError> {
        Ok(write_rule(&mut *self.guard()?, rule))
    }

    fn remove(&self, rule_id: &str) -> Result<StagingRule, RepositoryError> {
        let mut store = self.guard()?;
        let position = store
            .iter()
            .position(|rule| rule.id == rule_id)
            .ok_or(RepositoryError::NotFound)?;
        Ok(store.remove(position))
    }
}

/// Rule book the service starts with: impairment by DPD or collectibility,
/// SICR by DPD, PD deterioration or qualitative flags, performing fallback.
pub(crate) fn sample_rules() -> Vec<StagingRule> {
    vec![
        StagingRule::new("dpd-90", "DPD above 90", StageType::Stage3, 1).with_criterion(
            Criterion::new("dpd", CriterionOperator::GreaterThan, 90),
        ),
        StagingRule::new("impaired-collectibility", "Collectibility 3-5", StageType::Stage3, 2)
            .with_criterion(Criterion::new(
                "collectibility",
                CriterionOperator::In,
                CriterionValue::list(["3", "4", "5"]),
            )),
        StagingRule::new("dpd-30", "DPD above 30", StageType::Stage2, 10).with_criterion(
            Criterion::new("dpd", CriterionOperator::GreaterThan, 30),
        ),
        StagingRule::new("sicr-pd", "PD doubled or watchlisted", StageType::Stage2, 20)
            .with_criterion(Criterion::new(
                "pd_increase_pct",
                CriterionOperator::GreaterThan,
                100,
            ))
            .with_criterion(Criterion::new("watchlist", CriterionOperator::Equals, true).or()),
        StagingRule::new("restructured", "Restructured in weak sector", StageType::Stage2, 30)
            .with_criterion(Criterion::new(
                "restructured",
                CriterionOperator::Equals,
                true,
            ))
            .with_criterion(
                Criterion::new("industry_outlook", CriterionOperator::Contains, "Negative").and(),
            ),
        StagingRule::new("performing", "Performing", StageType::Stage1, 999),
    ]
}

pub(crate) fn sample_scenarios() -> Vec<EconomicScenario> {
    vec![
        EconomicScenario::new("base", "Baseline growth", ScenarioType::Base, 0.6),
        EconomicScenario::new("upside", "Commodity upswing", ScenarioType::Upside, 0.1),
        EconomicScenario::new("downside", "Rate shock", ScenarioType::Downside, 0.25),
        EconomicScenario::new("severe", "Deep recession", ScenarioType::Severe, 0.05),
    ]
}

pub(crate) fn sample_adjustments() -> Vec<ScenarioAdjustment> {
    vec![
        ScenarioAdjustment::new("base", ALL_SEGMENTS, 1.0, 1.0),
        ScenarioAdjustment::new("upside", ALL_SEGMENTS, 0.85, 0.95),
        ScenarioAdjustment::new("downside", ALL_SEGMENTS, 1.35, 1.1),
        ScenarioAdjustment::new("downside", "Corporate", 1.6, 1.15),
        ScenarioAdjustment::new("severe", ALL_SEGMENTS, 2.2, 1.25),
    ]
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}

pub(crate) fn read_json<T, P>(path: P) -> Result<T, AppError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let file = std::fs::File::open(path)?;
    let value = serde_json::from_reader(std::io::BufReader::new(file))?;
    Ok(value)
}

#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    use metrics_exporter_prometheus::PrometheusBuilder;

    AppState {
        readiness: Arc::new(AtomicBool::new(true)),
        metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        engine: EngineConfig::default(),
    }
}
