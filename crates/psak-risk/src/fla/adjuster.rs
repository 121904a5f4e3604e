use serde::{Deserialize, Serialize};

use super::domain::{
    AdjustmentRequest, AdvancedAdjustment, EconomicScenario, ProbabilityPolicy, RiskMetric,
    ScenarioAdjustment, ScenarioType, ALL_SEGMENTS,
};
use crate::migration::validation::row_balanced;

/// Allowed deviation of the scenario probability total from 1.0 before a
/// warning is raised.
pub const SCENARIO_PROBABILITY_TOLERANCE: f64 = 0.01;

/// Where a scenario's factor pair came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorSource {
    Segment,
    AllSegments,
    Identity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub scenario_id: String,
    pub scenario_name: String,
    pub scenario_type: ScenarioType,
    pub probability: f64,
    pub factor_source: FactorSource,
    pub pd_factor: f64,
    pub lgd_factor: f64,
    pub custom_pd_multiplier: f64,
    pub custom_lgd_multiplier: f64,
    pub adjusted_pd: f64,
    pub adjusted_lgd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdjustmentWarning {
    #[serde(rename_all = "camelCase")]
    OutOfRangeProbability {
        scenario_id: String,
        metric: RiskMetric,
        raw: f64,
        applied: f64,
    },
    ProbabilitySumMismatch {
        sum: f64,
    },
    #[serde(rename_all = "camelCase")]
    MissingCorrelation {
        matrix_id: String,
        variable_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedAdjustment {
    pub segment: String,
    pub policy: ProbabilityPolicy,
    pub per_scenario: Vec<ScenarioResult>,
    pub weighted_pd: f64,
    pub weighted_lgd: f64,
    pub probability_sum: f64,
    pub warnings: Vec<AdjustmentWarning>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdjustmentError {
    #[error("base {metric} {value} must be a probability within [0, 1]")]
    InvalidBase { metric: RiskMetric, value: f64 },
    #[error("scenario {scenario_id} probability {probability} must be within [0, 1]")]
    InvalidScenarioProbability { scenario_id: String, probability: f64 },
    #[error("adjustment for scenario {scenario_id} / segment {segment} has invalid {metric} factor {value}")]
    InvalidFactor {
        scenario_id: String,
        segment: String,
        metric: RiskMetric,
        value: f64,
    },
    #[error("variable {variable_id} has a non-finite impact or correlation")]
    InvalidVariableInput { variable_id: String },
    #[error("scenario {scenario_id} adjusted {metric} {value} falls outside [0, 1]")]
    OutOfRangeProbability {
        scenario_id: String,
        metric: RiskMetric,
        value: f64,
    },
}

/// Computes probability-weighted PD/LGD across economic scenarios.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScenarioAdjuster {
    policy: ProbabilityPolicy,
}

impl ScenarioAdjuster {
    pub fn new(policy: ProbabilityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ProbabilityPolicy {
        self.policy
    }

    pub fn apply(&self, request: &AdjustmentRequest) -> Result<WeightedAdjustment, AdjustmentError> {
        self.compute_weighted(
            request.base_pd,
            request.base_lgd,
            &request.scenarios,
            &request.adjustments,
            &request.segment,
            request.advanced.as_ref(),
        )
    }

    /// Scenario probabilities are used as given; a total away from 1.0 is
    /// reported in `warnings` but never renormalized.
    pub fn compute_weighted(
        &self,
        base_pd: f64,
        base_lgd: f64,
        scenarios: &[EconomicScenario],
        adjustments: &[ScenarioAdjustment],
        segment: &str,
        advanced: Option<&AdvancedAdjustment>,
    ) -> Result<WeightedAdjustment, AdjustmentError> {
        check_base(RiskMetric::Pd, base_pd)?;
        check_base(RiskMetric::Lgd, base_lgd)?;

        let mut warnings = Vec::new();
        let (custom_pd, custom_lgd) = match advanced {
            Some(advanced) => custom_multipliers(advanced, &mut warnings)?,
            None => (1.0, 1.0),
        };

        let mut per_scenario = Vec::with_capacity(scenarios.len());
        let mut weighted_pd = 0.0;
        let mut weighted_lgd = 0.0;
        let mut probability_sum = 0.0;

        for scenario in scenarios {
            if !is_probability(scenario.probability) {
                return Err(AdjustmentError::InvalidScenarioProbability {
                    scenario_id: scenario.id.clone(),
                    probability: scenario.probability,
                });
            }

            let (pd_factor, lgd_factor, factor_source) =
                resolve_factors(&scenario.id, segment, adjustments)?;

            let adjusted_pd = self.bound(
                &scenario.id,
                RiskMetric::Pd,
                base_pd * pd_factor * custom_pd,
                &mut warnings,
            )?;
            let adjusted_lgd = self.bound(
                &scenario.id,
                RiskMetric::Lgd,
                base_lgd * lgd_factor * custom_lgd,
                &mut warnings,
            )?;

            weighted_pd += scenario.probability * adjusted_pd;
            weighted_lgd += scenario.probability * adjusted_lgd;
            probability_sum += scenario.probability;

            per_scenario.push(ScenarioResult {
                scenario_id: scenario.id.clone(),
                scenario_name: scenario.name.clone(),
                scenario_type: scenario.scenario_type.clone(),
                probability: scenario.probability,
                factor_source,
                pd_factor,
                lgd_factor,
                custom_pd_multiplier: custom_pd,
                custom_lgd_multiplier: custom_lgd,
                adjusted_pd,
                adjusted_lgd,
            });
        }

        if !scenarios.is_empty() && !row_balanced(probability_sum, SCENARIO_PROBABILITY_TOLERANCE)
        {
            warnings.push(AdjustmentWarning::ProbabilitySumMismatch {
                sum: probability_sum,
            });
        }

        Ok(WeightedAdjustment {
            segment: segment.to_string(),
            policy: self.policy,
            per_scenario,
            weighted_pd,
            weighted_lgd,
            probability_sum,
            warnings,
        })
    }

    fn bound(
        &self,
        scenario_id: &str,
        metric: RiskMetric,
        raw: f64,
        warnings: &mut Vec<AdjustmentWarning>,
    ) -> Result<f64, AdjustmentError> {
        if is_probability(raw) {
            return Ok(raw);
        }

        let applied = match self.policy {
            ProbabilityPolicy::Reject => {
                return Err(AdjustmentError::OutOfRangeProbability {
                    scenario_id: scenario_id.to_string(),
                    metric,
                    value: raw,
                })
            }
            ProbabilityPolicy::Clamp => raw.clamp(0.0, 1.0),
            ProbabilityPolicy::Propagate => raw,
        };

        warnings.push(AdjustmentWarning::OutOfRangeProbability {
            scenario_id: scenario_id.to_string(),
            metric,
            raw,
            applied,
        });
        Ok(applied)
    }
}

/// Weighting with the default clamp policy.
pub fn compute_weighted(
    base_pd: f64,
    base_lgd: f64,
    scenarios: &[EconomicScenario],
    adjustments: &[ScenarioAdjustment],
    segment: &str,
    advanced: Option<&AdvancedAdjustment>,
) -> Result<WeightedAdjustment, AdjustmentError> {
    ScenarioAdjuster::default().compute_weighted(
        base_pd,
        base_lgd,
        scenarios,
        adjustments,
        segment,
        advanced,
    )
}

fn is_probability(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

fn check_base(metric: RiskMetric, value: f64) -> Result<(), AdjustmentError> {
    if is_probability(value) {
        Ok(())
    } else {
        Err(AdjustmentError::InvalidBase { metric, value })
    }
}

/// Segment-specific adjustment, then the "All" wildcard, then identity.
fn resolve_factors(
    scenario_id: &str,
    segment: &str,
    adjustments: &[ScenarioAdjustment],
) -> Result<(f64, f64, FactorSource), AdjustmentError> {
    let for_scenario = |key: &str| {
        adjustments
            .iter()
            .find(|adjustment| adjustment.scenario_id == scenario_id && adjustment.segment == key)
    };

    let (adjustment, source) = match for_scenario(segment) {
        Some(found) if segment == ALL_SEGMENTS => (found, FactorSource::AllSegments),
        Some(found) => (found, FactorSource::Segment),
        None => match for_scenario(ALL_SEGMENTS) {
            Some(found) => (found, FactorSource::AllSegments),
            None => return Ok((1.0, 1.0, FactorSource::Identity)),
        },
    };

    for (metric, value) in [
        (RiskMetric::Pd, adjustment.pd_adjustment_factor),
        (RiskMetric::Lgd, adjustment.lgd_adjustment_factor),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(AdjustmentError::InvalidFactor {
                scenario_id: scenario_id.to_string(),
                segment: adjustment.segment.clone(),
                metric,
                value,
            });
        }
    }

    Ok((
        adjustment.pd_adjustment_factor,
        adjustment.lgd_adjustment_factor,
        source,
    ))
}

/// `1 + Σ correlation × impact% / 100` per metric, over the active matrix.
fn custom_multipliers(
    advanced: &AdvancedAdjustment,
    warnings: &mut Vec<AdjustmentWarning>,
) -> Result<(f64, f64), AdjustmentError> {
    let mut pd = 1.0;
    let mut lgd = 1.0;

    for adjustment in &advanced.adjustments {
        if !adjustment.pd_impact_percent.is_finite() || !adjustment.lgd_impact_percent.is_finite()
        {
            return Err(AdjustmentError::InvalidVariableInput {
                variable_id: adjustment.variable_id.clone(),
            });
        }

        let correlation = advanced.correlations.iter().find(|correlation| {
            correlation.matrix_id == advanced.correlation_matrix_id
                && correlation.variable_id == adjustment.variable_id
        });

        match correlation {
            Some(correlation) => {
                if !correlation.pd_correlation.is_finite() || !correlation.lgd_correlation.is_finite()
                {
                    return Err(AdjustmentError::InvalidVariableInput {
                        variable_id: adjustment.variable_id.clone(),
                    });
                }
                pd += correlation.pd_correlation * adjustment.pd_impact_percent / 100.0;
                lgd += correlation.lgd_correlation * adjustment.lgd_impact_percent / 100.0;
            }
            None => warnings.push(AdjustmentWarning::MissingCorrelation {
                matrix_id: advanced.correlation_matrix_id.clone(),
                variable_id: adjustment.variable_id.clone(),
            }),
        }
    }

    Ok((pd, lgd))
}
