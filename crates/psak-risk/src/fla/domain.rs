use std::fmt;

use serde::{Deserialize, Serialize};

/// Segment key that applies an adjustment to every segment without its own.
pub const ALL_SEGMENTS: &str = "All";

/// Macroeconomic outlook label. Anything beyond the four standard labels is
/// kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScenarioType {
    Base,
    Upside,
    Downside,
    Severe,
    Other(String),
}

impl ScenarioType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Base => "Base",
            Self::Upside => "Upside",
            Self::Downside => "Downside",
            Self::Severe => "Severe",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for ScenarioType {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "base" => Self::Base,
            "upside" => Self::Upside,
            "downside" => Self::Downside,
            "severe" => Self::Severe,
            _ => Self::Other(raw),
        }
    }
}

impl From<ScenarioType> for String {
    fn from(kind: ScenarioType) -> Self {
        match kind {
            ScenarioType::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ScenarioType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicScenario {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub scenario_type: ScenarioType,
    pub probability: f64,
}

impl EconomicScenario {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        scenario_type: ScenarioType,
        probability: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            scenario_type,
            probability,
        }
    }
}

/// Multiplicative PD/LGD shock for one scenario and segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioAdjustment {
    pub scenario_id: String,
    pub segment: String,
    pub pd_adjustment_factor: f64,
    pub lgd_adjustment_factor: f64,
}

impl ScenarioAdjustment {
    pub fn new(
        scenario_id: impl Into<String>,
        segment: impl Into<String>,
        pd_adjustment_factor: f64,
        lgd_adjustment_factor: f64,
    ) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            segment: segment.into(),
            pd_adjustment_factor,
            lgd_adjustment_factor,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.segment == ALL_SEGMENTS
    }
}

/// Sensitivity of PD and LGD to one macro variable within a correlation matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableCorrelation {
    pub matrix_id: String,
    pub variable_id: String,
    pub pd_correlation: f64,
    pub lgd_correlation: f64,
}

/// Analyst-entered shock to a macro variable, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomVariableAdjustment {
    pub variable_id: String,
    pub pd_impact_percent: f64,
    pub lgd_impact_percent: f64,
}

/// Advanced mode inputs: variable shocks resolved against one correlation matrix.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedAdjustment {
    pub correlation_matrix_id: String,
    #[serde(default)]
    pub correlations: Vec<VariableCorrelation>,
    #[serde(default)]
    pub adjustments: Vec<CustomVariableAdjustment>,
}

/// Everything one weighting run needs, as submitted by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentRequest {
    pub base_pd: f64,
    pub base_lgd: f64,
    pub scenarios: Vec<EconomicScenario>,
    #[serde(default)]
    pub adjustments: Vec<ScenarioAdjustment>,
    #[serde(default = "default_segment")]
    pub segment: String,
    #[serde(default)]
    pub advanced: Option<AdvancedAdjustment>,
}

fn default_segment() -> String {
    ALL_SEGMENTS.to_string()
}

/// What to do when an adjusted PD or LGD leaves [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbabilityPolicy {
    #[default]
    Clamp,
    Propagate,
    Reject,
}

impl ProbabilityPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "clamp" => Some(Self::Clamp),
            "propagate" => Some(Self::Propagate),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clamp => "clamp",
            Self::Propagate => "propagate",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for ProbabilityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskMetric {
    Pd,
    Lgd,
}

impl fmt::Display for RiskMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pd => f.write_str("PD"),
            Self::Lgd => f.write_str("LGD"),
        }
    }
}
