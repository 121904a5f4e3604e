use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::criteria::{self, CriterionTrace};
use super::domain::{EvaluationContext, LogicOperator, StageType, StagingRule};

/// One evaluated rule in the order the engine visited it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationStep {
    pub rule_id: String,
    pub rule_name: String,
    pub priority: i32,
    pub stage_result: StageType,
    pub is_default: bool,
    pub matched: bool,
    pub criteria: Vec<CriterionTrace>,
}

/// Result of running a rule list against one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagingEvaluation {
    pub stage: Option<StageType>,
    pub matched_rule: Option<StagingRule>,
    pub trace: Vec<EvaluationStep>,
}

impl StagingEvaluation {
    /// Convert the evaluation into a definite assignment; a missing stage is a
    /// hard failure and never defaults to Stage 1.
    pub fn into_assignment(self) -> Result<StageAssignment, StagingError> {
        match (self.stage, self.matched_rule) {
            (Some(stage), Some(rule)) => Ok(StageAssignment {
                stage,
                rule,
                trace: self.trace,
            }),
            _ => Err(StagingError::UnassignedStage {
                evaluated_rules: self.trace.len(),
            }),
        }
    }
}

/// A transaction's stage together with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageAssignment {
    pub stage: StageType,
    pub rule: StagingRule,
    pub trace: Vec<EvaluationStep>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StagingError {
    #[error("no active staging rule matched the transaction ({evaluated_rules} rule(s) evaluated)")]
    UnassignedStage { evaluated_rules: usize },
}

/// Evaluate `rules` against `context` and return the first matching active
/// rule in ascending priority order.
///
/// Inactive rules are skipped without a trace entry. Every criterion of a
/// visited rule is evaluated and recorded, but the decision follows the
/// left-to-right AND/OR fold seeded by the first criterion.
pub fn evaluate(rules: &[StagingRule], context: &EvaluationContext) -> StagingEvaluation {
    let mut ordered: Vec<&StagingRule> = rules.iter().filter(|rule| rule.is_active).collect();
    ordered.sort_by_key(|rule| rule.priority);

    let mut trace = Vec::with_capacity(ordered.len());

    for rule in ordered {
        let (matched, criteria) = evaluate_rule(rule, context);
        trace.push(EvaluationStep {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            priority: rule.priority,
            stage_result: rule.stage_result,
            is_default: rule.is_default(),
            matched,
            criteria,
        });

        if matched {
            return StagingEvaluation {
                stage: Some(rule.stage_result),
                matched_rule: Some(rule.clone()),
                trace,
            };
        }
    }

    StagingEvaluation {
        stage: None,
        matched_rule: None,
        trace,
    }
}

fn evaluate_rule(rule: &StagingRule, context: &EvaluationContext) -> (bool, Vec<CriterionTrace>) {
    if rule.criteria.is_empty() {
        return (true, Vec::new());
    }

    let traces: Vec<CriterionTrace> = rule
        .criteria
        .iter()
        .map(|criterion| criteria::check(criterion, context))
        .collect();

    let mut acc = traces[0].matched;
    for (criterion, trace) in rule.criteria.iter().zip(&traces).skip(1) {
        acc = match criterion.logic() {
            LogicOperator::Or => acc || trace.matched,
            LogicOperator::And => acc && trace.matched,
        };
    }

    (acc, traces)
}

/// Structural problems that make a rule list unsafe to stage with.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleSetError {
    #[error("rule set has no active default rule (a rule without criteria)")]
    MissingDefaultRule,
    #[error("rule set has more than one active default rule: {0:?}")]
    MultipleDefaultRules(Vec<String>),
    #[error("default rule '{default_rule}' is evaluated before {shadowed:?}, which can never match")]
    DefaultRuleShadows {
        default_rule: String,
        shadowed: Vec<String>,
    },
    #[error("duplicate rule id '{0}'")]
    DuplicateRuleId(String),
}

/// Validated rule list: unique ids and exactly one active catch-all rule
/// evaluated after every other active rule, so evaluation always yields a
/// stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSet {
    rules: Vec<StagingRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<StagingRule>) -> Result<Self, RuleSetError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(RuleSetError::DuplicateRuleId(rule.id.clone()));
            }
        }

        let defaults: Vec<&StagingRule> = rules
            .iter()
            .filter(|rule| rule.is_active && rule.is_default())
            .collect();

        let default_rule = match defaults.as_slice() {
            [] => return Err(RuleSetError::MissingDefaultRule),
            [single] => *single,
            many => {
                return Err(RuleSetError::MultipleDefaultRules(
                    many.iter().map(|rule| rule.id.clone()).collect(),
                ))
            }
        };

        // Stable ordering: equal priorities keep their input order, so a
        // default listed before a peer with the same priority shadows it.
        let default_position = rules
            .iter()
            .position(|rule| std::ptr::eq(rule, default_rule))
            .unwrap_or(0);
        let shadowed: Vec<String> = rules
            .iter()
            .enumerate()
            .filter(|(index, rule)| {
                rule.is_active
                    && !rule.is_default()
                    && (rule.priority > default_rule.priority
                        || (rule.priority == default_rule.priority && *index > default_position))
            })
            .map(|(_, rule)| rule.id.clone())
            .collect();

        if !shadowed.is_empty() {
            return Err(RuleSetError::DefaultRuleShadows {
                default_rule: default_rule.id.clone(),
                shadowed,
            });
        }

        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[StagingRule] {
        &self.rules
    }

    pub fn default_rule(&self) -> Option<&StagingRule> {
        self.rules
            .iter()
            .find(|rule| rule.is_active && rule.is_default())
    }

    pub fn evaluate(&self, context: &EvaluationContext) -> StagingEvaluation {
        evaluate(&self.rules, context)
    }

    pub fn assign(&self, context: &EvaluationContext) -> Result<StageAssignment, StagingError> {
        self.evaluate(context).into_assignment()
    }

    pub fn into_rules(self) -> Vec<StagingRule> {
        self.rules
    }
}

impl TryFrom<Vec<StagingRule>> for RuleSet {
    type Error = RuleSetError;

    fn try_from(rules: Vec<StagingRule>) -> Result<Self, Self::Error> {
        Self::new(rules)
    }
}
