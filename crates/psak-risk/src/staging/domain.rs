use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// PSAK 71 impairment bucket assigned to a financing facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StageType {
    #[serde(rename = "Stage 1")]
    Stage1,
    #[serde(rename = "Stage 2")]
    Stage2,
    #[serde(rename = "Stage 3")]
    Stage3,
}

impl StageType {
    pub const fn ordered() -> [Self; 3] {
        [Self::Stage1, Self::Stage2, Self::Stage3]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Stage1 => "Stage 1",
            Self::Stage2 => "Stage 2",
            Self::Stage3 => "Stage 3",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Stage1 => "Performing",
            Self::Stage2 => "Significant increase in credit risk",
            Self::Stage3 => "Credit impaired",
        }
    }
}

impl fmt::Display for StageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Single attribute value carried by a transaction or a criterion literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric view used by ordering operators; numeric strings coerce.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            FieldValue::Text(raw) => raw.trim().parse::<f64>().ok(),
            FieldValue::Boolean(_) => None,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Boolean(value) => write!(f, "{value}"),
            FieldValue::Number(value) => write!(f, "{value}"),
            FieldValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Literal a criterion compares against. Lists are only meaningful for
/// membership operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CriterionValue {
    List(Vec<FieldValue>),
    Single(FieldValue),
}

impl CriterionValue {
    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<FieldValue> for CriterionValue {
    fn from(value: FieldValue) -> Self {
        Self::Single(value)
    }
}

macro_rules! scalar_literal {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for CriterionValue {
                fn from(value: $ty) -> Self {
                    Self::Single(FieldValue::from(value))
                }
            }
        )*
    };
}

scalar_literal!(bool, f64, i64, i32, u32, &str, String);

impl fmt::Display for CriterionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CriterionValue::Single(value) => write!(f, "{value}"),
            CriterionValue::List(values) => {
                let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
                f.write_str(&rendered.join(","))
            }
        }
    }
}

/// Comparison applied by a criterion. Operator names arriving from rule
/// editors that the engine does not know are preserved as `Unsupported` so the
/// rule still loads and the criterion fails closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CriterionOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    NotContains,
    In,
    NotIn,
    Unsupported(String),
}

impl CriterionOperator {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Unsupported(raw) => raw,
        }
    }
}

impl From<String> for CriterionOperator {
    fn from(raw: String) -> Self {
        match raw.trim() {
            "equals" => Self::Equals,
            "not_equals" => Self::NotEquals,
            "greater_than" => Self::GreaterThan,
            "less_than" => Self::LessThan,
            "contains" => Self::Contains,
            "not_contains" => Self::NotContains,
            "in" => Self::In,
            "not_in" => Self::NotIn,
            _ => Self::Unsupported(raw),
        }
    }
}

impl From<CriterionOperator> for String {
    fn from(operator: CriterionOperator) -> Self {
        match operator {
            CriterionOperator::Unsupported(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for CriterionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a criterion combines with the running result of the criteria before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicOperator {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub field: String,
    pub operator: CriterionOperator,
    pub value: CriterionValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic_operator: Option<LogicOperator>,
}

impl Criterion {
    pub fn new(
        field: impl Into<String>,
        operator: CriterionOperator,
        value: impl Into<CriterionValue>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            logic_operator: None,
        }
    }

    pub fn or(mut self) -> Self {
        self.logic_operator = Some(LogicOperator::Or);
        self
    }

    pub fn and(mut self) -> Self {
        self.logic_operator = Some(LogicOperator::And);
        self
    }

    /// Connective applied when folding; absent means AND.
    pub fn logic(&self) -> LogicOperator {
        self.logic_operator.unwrap_or_default()
    }
}

/// Ordered business rule producing a stage when its criteria hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagingRule {
    pub id: String,
    pub name: String,
    pub stage_result: StageType,
    pub priority: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
}

fn default_active() -> bool {
    true
}

impl StagingRule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        stage_result: StageType,
        priority: i32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stage_result,
            priority,
            is_active: true,
            criteria: Vec::new(),
        }
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// A rule without criteria is the catch-all fallback.
    pub fn is_default(&self) -> bool {
        self.criteria.is_empty()
    }
}

/// Flat attribute map describing one transaction's risk profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationContext {
    fields: BTreeMap<String, FieldValue>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for EvaluationContext
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut context = Self::new();
        for (field, value) in iter {
            context.insert(field, value);
        }
        context
    }
}

/// Transaction identifier paired with its attributes, as submitted for
/// assessment or batch simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionProfile {
    pub transaction_id: String,
    pub attributes: EvaluationContext,
}
