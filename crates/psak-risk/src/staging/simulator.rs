use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{StageType, StagingRule, TransactionProfile};
use super::engine::evaluate;

/// Stage produced for one transaction in a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedOutcome {
    pub transaction_id: String,
    pub stage: Option<StageType>,
    pub matched_rule_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleHit {
    pub rule_id: String,
    pub rule_name: String,
    pub stage_result: StageType,
    pub hits: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDistributionEntry {
    pub stage: StageType,
    pub stage_label: &'static str,
    pub count: usize,
    pub share: f64,
}

/// Aggregate view of a draft rule set applied to a portfolio sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    pub total: usize,
    pub distribution: Vec<StageDistributionEntry>,
    pub rule_hits: Vec<RuleHit>,
    pub unassigned: Vec<String>,
    pub outcomes: Vec<SimulatedOutcome>,
}

/// Run `rules` over every transaction and tally the results. Unassigned
/// transactions are listed rather than folded into any stage.
pub fn simulate(rules: &[StagingRule], transactions: &[TransactionProfile]) -> SimulationSummary {
    let mut stage_counts: BTreeMap<StageType, usize> = BTreeMap::new();
    let mut hits: BTreeMap<&str, usize> = BTreeMap::new();
    let mut unassigned = Vec::new();
    let mut outcomes = Vec::with_capacity(transactions.len());

    for transaction in transactions {
        let evaluation = evaluate(rules, &transaction.attributes);
        let matched_rule_id = evaluation.matched_rule.as_ref().map(|rule| rule.id.clone());

        match (&evaluation.stage, &evaluation.matched_rule) {
            (Some(stage), Some(rule)) => {
                *stage_counts.entry(*stage).or_default() += 1;
                if let Some(source) = rules.iter().find(|candidate| candidate.id == rule.id) {
                    *hits.entry(source.id.as_str()).or_default() += 1;
                }
            }
            _ => unassigned.push(transaction.transaction_id.clone()),
        }

        outcomes.push(SimulatedOutcome {
            transaction_id: transaction.transaction_id.clone(),
            stage: evaluation.stage,
            matched_rule_id,
        });
    }

    let total = transactions.len();
    let distribution = StageType::ordered()
        .into_iter()
        .map(|stage| {
            let count = stage_counts.get(&stage).copied().unwrap_or(0);
            StageDistributionEntry {
                stage,
                stage_label: stage.label(),
                count,
                share: if total == 0 {
                    0.0
                } else {
                    count as f64 / total as f64
                },
            }
        })
        .collect();

    let mut active: Vec<&StagingRule> = rules.iter().filter(|rule| rule.is_active).collect();
    active.sort_by_key(|rule| rule.priority);
    let rule_hits = active
        .into_iter()
        .map(|rule| RuleHit {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            stage_result: rule.stage_result,
            hits: hits.get(rule.id.as_str()).copied().unwrap_or(0),
        })
        .collect();

    SimulationSummary {
        total,
        distribution,
        rule_hits,
        unassigned,
        outcomes,
    }
}
