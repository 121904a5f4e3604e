//! Expected credit loss for a single facility: `EAD × PD × LGD`, with the PD
//! horizon chosen by stage.

use serde::{Deserialize, Serialize};

use crate::fla::RiskMetric;
use crate::staging::StageType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EclInput {
    #[serde(default)]
    pub facility_id: Option<String>,
    pub stage: StageType,
    pub exposure_at_default: f64,
    pub pd_12_month: f64,
    pub pd_lifetime: f64,
    pub lgd: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdHorizon {
    TwelveMonth,
    Lifetime,
    CreditImpaired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EclResult {
    pub facility_id: Option<String>,
    pub stage: StageType,
    pub horizon: PdHorizon,
    pub exposure_at_default: f64,
    pub applied_pd: f64,
    pub lgd: f64,
    pub expected_credit_loss: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EclError {
    #[error("exposure at default {0} must be a non-negative amount")]
    InvalidExposure(f64),
    #[error("{metric} {value} must be a probability within [0, 1]")]
    InvalidProbability { metric: RiskMetric, value: f64 },
    #[error("12-month PD {pd_12_month} exceeds lifetime PD {pd_lifetime}")]
    InconsistentHorizons { pd_12_month: f64, pd_lifetime: f64 },
}

pub fn calculate_ecl(input: &EclInput) -> Result<EclResult, EclError> {
    if !input.exposure_at_default.is_finite() || input.exposure_at_default < 0.0 {
        return Err(EclError::InvalidExposure(input.exposure_at_default));
    }
    for (metric, value) in [
        (RiskMetric::Pd, input.pd_12_month),
        (RiskMetric::Pd, input.pd_lifetime),
        (RiskMetric::Lgd, input.lgd),
    ] {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(EclError::InvalidProbability { metric, value });
        }
    }
    if input.pd_12_month > input.pd_lifetime {
        return Err(EclError::InconsistentHorizons {
            pd_12_month: input.pd_12_month,
            pd_lifetime: input.pd_lifetime,
        });
    }

    let (horizon, applied_pd) = match input.stage {
        StageType::Stage1 => (PdHorizon::TwelveMonth, input.pd_12_month),
        StageType::Stage2 => (PdHorizon::Lifetime, input.pd_lifetime),
        StageType::Stage3 => (PdHorizon::CreditImpaired, 1.0),
    };

    Ok(EclResult {
        facility_id: input.facility_id.clone(),
        stage: input.stage,
        horizon,
        exposure_at_default: input.exposure_at_default,
        applied_pd,
        lgd: input.lgd,
        expected_credit_loss: input.exposure_at_default * applied_pd * input.lgd,
    })
}

/// Sum of ECL over a portfolio, failing on the first invalid facility.
pub fn portfolio_ecl(inputs: &[EclInput]) -> Result<(Vec<EclResult>, f64), EclError> {
    let results = inputs
        .iter()
        .map(calculate_ecl)
        .collect::<Result<Vec<_>, _>>()?;
    let total = results.iter().map(|result| result.expected_credit_loss).sum();
    Ok((results, total))
}
