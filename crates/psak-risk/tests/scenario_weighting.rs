use psak_risk::ecl::{calculate_ecl, EclInput};
use psak_risk::fla::{
    AdjustmentRequest, AdjustmentWarning, FactorSource, ProbabilityPolicy, ScenarioAdjuster,
};
use psak_risk::staging::StageType;
use serde_json::json;

fn request(segment: &str) -> AdjustmentRequest {
    serde_json::from_value(json!({
        "basePd": 0.05,
        "baseLgd": 0.45,
        "segment": segment,
        "scenarios": [
            { "id": "s-base", "name": "Baseline", "type": "Base", "probability": 0.7 },
            { "id": "s-down", "name": "Commodity slump", "type": "Downside", "probability": 0.3 }
        ],
        "adjustments": [
            { "scenarioId": "s-base", "segment": "All", "pdAdjustmentFactor": 1.0, "lgdAdjustmentFactor": 1.0 },
            { "scenarioId": "s-down", "segment": "All", "pdAdjustmentFactor": 1.5, "lgdAdjustmentFactor": 1.1 },
            { "scenarioId": "s-down", "segment": "Mining", "pdAdjustmentFactor": 3.0, "lgdAdjustmentFactor": 1.3 }
        ]
    }))
    .expect("request deserializes")
}

#[test]
fn wildcard_adjustments_weight_to_expected_pd() {
    let result = ScenarioAdjuster::default()
        .apply(&request("Consumer"))
        .expect("weighted");

    assert!((result.weighted_pd - 0.0575).abs() < 1e-12);
    assert_eq!(result.per_scenario.len(), 2);
    assert!(result
        .per_scenario
        .iter()
        .all(|scenario| scenario.factor_source == FactorSource::AllSegments));
}

#[test]
fn segment_override_and_policy_change_outcome() {
    let mut mining = request("Mining");
    mining.base_pd = 0.4;

    let clamped = ScenarioAdjuster::new(ProbabilityPolicy::Clamp)
        .apply(&mining)
        .expect("clamped");
    assert_eq!(clamped.per_scenario[1].factor_source, FactorSource::Segment);
    assert_eq!(clamped.per_scenario[1].adjusted_pd, 1.0);
    assert!((clamped.weighted_pd - (0.7 * 0.4 + 0.3)).abs() < 1e-12);
    assert!(clamped
        .warnings
        .iter()
        .any(|warning| matches!(warning, AdjustmentWarning::OutOfRangeProbability { .. })));

    assert!(ScenarioAdjuster::new(ProbabilityPolicy::Reject)
        .apply(&mining)
        .is_err());
}

#[test]
fn weighted_parameters_feed_stage_two_ecl() {
    let weighted = ScenarioAdjuster::default()
        .apply(&request("Consumer"))
        .expect("weighted");

    let ecl = calculate_ecl(&EclInput {
        facility_id: Some("FAC-77".to_string()),
        stage: StageType::Stage2,
        exposure_at_default: 250_000.0,
        pd_12_month: weighted.weighted_pd / 2.0,
        pd_lifetime: weighted.weighted_pd,
        lgd: weighted.weighted_lgd,
    })
    .expect("ecl");

    let expected = 250_000.0 * weighted.weighted_pd * weighted.weighted_lgd;
    assert!((ecl.expected_credit_loss - expected).abs() < 1e-9);
}
