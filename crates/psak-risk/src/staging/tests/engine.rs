use super::common::*;
use crate::staging::domain::{
    Criterion, CriterionOperator, EvaluationContext, StageType, StagingRule,
};
use crate::staging::{evaluate, CriterionAnomaly, RuleSet, RuleSetError, StagingError};

#[test]
fn dpd_between_thresholds_lands_in_stage_two() {
    let context = EvaluationContext::new().with("dpd", 45);

    let evaluation = evaluate(&dpd_rules(), &context);

    assert_eq!(evaluation.stage, Some(StageType::Stage2));
    let rule = evaluation.matched_rule.expect("matched rule");
    assert_eq!(rule.id, "dpd-30");
    assert_eq!(evaluation.trace.len(), 2);
    assert!(!evaluation.trace[0].matched);
    assert!(evaluation.trace[1].matched);
}

#[test]
fn current_facility_falls_through_to_default() {
    let context = EvaluationContext::new().with("dpd", 0);

    let evaluation = evaluate(&dpd_rules(), &context);

    assert_eq!(evaluation.stage, Some(StageType::Stage1));
    let last = evaluation.trace.last().expect("trace step");
    assert!(last.is_default);
    assert!(last.criteria.is_empty());
}

#[test]
fn missing_default_rule_leaves_stage_unassigned() {
    let rules: Vec<StagingRule> = dpd_rules()
        .into_iter()
        .filter(|rule| !rule.is_default())
        .collect();
    let context = EvaluationContext::new().with("dpd", 5);

    let evaluation = evaluate(&rules, &context);

    assert_eq!(evaluation.stage, None);
    assert!(evaluation.matched_rule.is_none());
    assert_eq!(evaluation.trace.len(), 2);
    match evaluation.into_assignment() {
        Err(StagingError::UnassignedStage { evaluated_rules }) => assert_eq!(evaluated_rules, 2),
        other => panic!("expected unassigned stage, got {other:?}"),
    }
}

#[test]
fn priority_not_input_order_decides() {
    let mut rules = dpd_rules();
    rules.reverse();
    let context = EvaluationContext::new().with("dpd", 120);

    let evaluation = evaluate(&rules, &context);

    assert_eq!(evaluation.stage, Some(StageType::Stage3));
}

#[test]
fn inactive_rules_are_skipped_without_trace() {
    let mut rules = dpd_rules();
    rules[0].is_active = false;
    let context = EvaluationContext::new().with("dpd", 120);

    let evaluation = evaluate(&rules, &context);

    assert_eq!(evaluation.stage, Some(StageType::Stage2));
    assert!(evaluation.trace.iter().all(|step| step.rule_id != "dpd-90"));

    let mut reordered = rules.clone();
    reordered.swap(0, 2);
    assert_eq!(evaluate(&reordered, &context), evaluation);
}

#[test]
fn equal_priorities_keep_input_order() {
    let rules = vec![
        StagingRule::new("first", "First", StageType::Stage3, 5)
            .with_criterion(Criterion::new("dpd", CriterionOperator::GreaterThan, 10)),
        StagingRule::new("second", "Second", StageType::Stage2, 5)
            .with_criterion(Criterion::new("dpd", CriterionOperator::GreaterThan, 10)),
        default_rule(),
    ];

    let evaluation = evaluate(&rules, &EvaluationContext::new().with("dpd", 20));

    assert_eq!(evaluation.matched_rule.map(|rule| rule.id).as_deref(), Some("first"));
}

#[test]
fn or_connective_rescues_failed_prefix() {
    let context = EvaluationContext::new()
        .with("pd_increase_pct", 40)
        .with("watchlist", true)
        .with("collectibility", "1");

    let evaluation = evaluate(&sicr_rules(), &context);

    assert_eq!(evaluation.stage, Some(StageType::Stage2));
    assert_eq!(
        evaluation.matched_rule.map(|rule| rule.id).as_deref(),
        Some("sicr-pd")
    );
}

#[test]
fn and_connective_requires_both_sides() {
    let context = EvaluationContext::new()
        .with("restructured", true)
        .with("industry_outlook", "Stable")
        .with("pd_increase_pct", 10)
        .with("watchlist", false)
        .with("collectibility", "1");

    let evaluation = evaluate(&sicr_rules(), &context);

    assert_eq!(evaluation.stage, Some(StageType::Stage1));
}

#[test]
fn fold_is_left_to_right_without_precedence() {
    // (false OR true) AND false == false, whereas AND-before-OR would give true.
    let rule = StagingRule::new("fold", "Fold", StageType::Stage2, 1)
        .with_criterion(Criterion::new("a", CriterionOperator::Equals, true))
        .with_criterion(Criterion::new("b", CriterionOperator::Equals, true).or())
        .with_criterion(Criterion::new("c", CriterionOperator::Equals, true).and());
    let context = EvaluationContext::new()
        .with("a", false)
        .with("b", true)
        .with("c", false);

    let evaluation = evaluate(&[rule], &context);

    assert_eq!(evaluation.stage, None);
}

#[test]
fn every_criterion_is_traced_even_after_failure() {
    let context = EvaluationContext::new().with("restructured", false);

    let evaluation = evaluate(&sicr_rules(), &context);

    let restructured = evaluation
        .trace
        .iter()
        .find(|step| step.rule_id == "restructured")
        .expect("restructured rule visited");
    assert_eq!(restructured.criteria.len(), 2);
    assert!(!restructured.criteria[0].matched);
    assert_eq!(
        restructured.criteria[1].anomaly,
        Some(CriterionAnomaly::FieldNotFound)
    );

    let impaired = &evaluation.trace[0];
    assert!(impaired.criteria[0].reason.contains("collectibility"));
}

#[test]
fn evaluation_is_deterministic() {
    let context = EvaluationContext::new()
        .with("pd_increase_pct", 250)
        .with("collectibility", "2");

    let first = evaluate(&sicr_rules(), &context);
    let second = evaluate(&sicr_rules(), &context);

    assert_eq!(first, second);
}

#[test]
fn rule_set_requires_single_default() {
    let without_default: Vec<StagingRule> = dpd_rules()
        .into_iter()
        .filter(|rule| !rule.is_default())
        .collect();
    assert_eq!(
        RuleSet::new(without_default),
        Err(RuleSetError::MissingDefaultRule)
    );

    let mut doubled = dpd_rules();
    doubled.push(StagingRule::new("fallback-2", "Second fallback", StageType::Stage1, 1000));
    match RuleSet::new(doubled) {
        Err(RuleSetError::MultipleDefaultRules(ids)) => {
            assert_eq!(ids, vec!["performing".to_string(), "fallback-2".to_string()]);
        }
        other => panic!("expected multiple default error, got {other:?}"),
    }
}

#[test]
fn rule_set_ignores_inactive_defaults() {
    let mut rules = dpd_rules();
    rules.push(StagingRule::new("legacy", "Legacy fallback", StageType::Stage2, 5).inactive());

    let rule_set = RuleSet::new(rules).expect("inactive default tolerated");

    assert_eq!(
        rule_set.default_rule().map(|rule| rule.id.as_str()),
        Some("performing")
    );
}

#[test]
fn rule_set_rejects_shadowing_default() {
    let mut rules = dpd_rules();
    rules[2].priority = 0;

    match RuleSet::new(rules) {
        Err(RuleSetError::DefaultRuleShadows {
            default_rule,
            shadowed,
        }) => {
            assert_eq!(default_rule, "performing");
            assert_eq!(shadowed, vec!["dpd-90".to_string(), "dpd-30".to_string()]);
        }
        other => panic!("expected shadowing error, got {other:?}"),
    }
}

#[test]
fn rule_set_rejects_duplicate_ids() {
    let mut rules = dpd_rules();
    rules[1].id = "dpd-90".to_string();

    assert_eq!(
        RuleSet::new(rules),
        Err(RuleSetError::DuplicateRuleId("dpd-90".to_string()))
    );
}

#[test]
fn validated_rule_set_always_assigns() {
    let rule_set = RuleSet::new(sicr_rules()).expect("valid rule set");

    for context in [
        EvaluationContext::new(),
        EvaluationContext::new().with("collectibility", "4"),
        EvaluationContext::new().with("pd_increase_pct", "not a number"),
    ] {
        assert!(rule_set.assign(&context).is_ok());
    }
}

#[test]
fn rules_deserialize_from_editor_payloads() {
    let payload = serde_json::json!([
        {
            "id": "r1",
            "name": "Severe arrears",
            "stageResult": "Stage 3",
            "priority": 1,
            "isActive": true,
            "criteria": [
                { "field": "dpd", "operator": "greater_than", "value": 90 },
                { "field": "collectibility", "operator": "in", "value": ["4", "5"], "logicOperator": "OR" }
            ]
        },
        {
            "id": "r2",
            "name": "Unknown operator",
            "stageResult": "Stage 2",
            "priority": 2,
            "criteria": [{ "field": "dpd", "operator": "between", "value": 30 }]
        },
        { "id": "r3", "name": "Default", "stageResult": "Stage 1", "priority": 999, "criteria": [] }
    ]);

    let rules: Vec<StagingRule> = serde_json::from_value(payload).expect("rules parse");
    assert!(rules[1].is_active);
    assert_eq!(
        rules[1].criteria[0].operator,
        CriterionOperator::Unsupported("between".to_string())
    );

    let evaluation = evaluate(&rules, &EvaluationContext::new().with("collectibility", "5"));
    assert_eq!(evaluation.stage, Some(StageType::Stage3));

    let evaluation = evaluate(&rules, &EvaluationContext::new().with("dpd", 45));
    assert_eq!(evaluation.stage, Some(StageType::Stage1));
    assert_eq!(
        evaluation.trace[1].criteria[0].anomaly,
        Some(CriterionAnomaly::UnsupportedOperator)
    );
}
