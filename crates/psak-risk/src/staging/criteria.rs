use serde::{Deserialize, Serialize};

use super::domain::{
    Criterion, CriterionOperator, CriterionValue, EvaluationContext, FieldValue, LogicOperator,
};

/// Why a criterion failed closed instead of producing a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionAnomaly {
    FieldNotFound,
    UnsupportedOperator,
    NonNumericComparison,
    ExpectedList,
}

/// Per-criterion record kept in the evaluation trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionTrace {
    pub field: String,
    pub operator: CriterionOperator,
    pub expected: CriterionValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<FieldValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logic: Option<LogicOperator>,
    pub matched: bool,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly: Option<CriterionAnomaly>,
}

/// True when the criterion holds for the context. Missing fields, unsupported
/// operators, and mistyped literals never match.
pub fn matches(criterion: &Criterion, context: &EvaluationContext) -> bool {
    check(criterion, context).matched
}

pub(crate) fn check(criterion: &Criterion, context: &EvaluationContext) -> CriterionTrace {
    let actual = context.get(&criterion.field).cloned();
    let verdict = match &actual {
        None => Verdict::failed_closed(
            CriterionAnomaly::FieldNotFound,
            format!("field '{}' not found in context", criterion.field),
        ),
        Some(actual) => compare(criterion, actual),
    };

    CriterionTrace {
        field: criterion.field.clone(),
        operator: criterion.operator.clone(),
        expected: criterion.value.clone(),
        actual,
        logic: criterion.logic_operator,
        matched: verdict.matched,
        reason: verdict.reason,
        anomaly: verdict.anomaly,
    }
}

struct Verdict {
    matched: bool,
    reason: String,
    anomaly: Option<CriterionAnomaly>,
}

impl Verdict {
    fn outcome(matched: bool, reason: String) -> Self {
        Self {
            matched,
            reason,
            anomaly: None,
        }
    }

    fn failed_closed(anomaly: CriterionAnomaly, reason: String) -> Self {
        Self {
            matched: false,
            reason,
            anomaly: Some(anomaly),
        }
    }
}

fn compare(criterion: &Criterion, actual: &FieldValue) -> Verdict {
    let field = &criterion.field;
    let expected = &criterion.value;

    match &criterion.operator {
        CriterionOperator::Equals => {
            let matched = single(expected).is_some_and(|literal| actual == literal);
            Verdict::outcome(matched, describe(field, actual, matched, "==", "!=", expected))
        }
        CriterionOperator::NotEquals => {
            let matched = single(expected).map_or(true, |literal| actual != literal);
            Verdict::outcome(matched, describe(field, actual, matched, "!=", "==", expected))
        }
        CriterionOperator::GreaterThan => ordered(field, actual, expected, ">", |a, b| a > b),
        CriterionOperator::LessThan => ordered(field, actual, expected, "<", |a, b| a < b),
        CriterionOperator::Contains => {
            let matched = actual.to_string().contains(&expected.to_string());
            Verdict::outcome(
                matched,
                describe(field, actual, matched, "contains", "does not contain", expected),
            )
        }
        CriterionOperator::NotContains => {
            let matched = !actual.to_string().contains(&expected.to_string());
            Verdict::outcome(
                matched,
                describe(field, actual, matched, "does not contain", "contains", expected),
            )
        }
        CriterionOperator::In => membership(field, actual, expected, true),
        CriterionOperator::NotIn => membership(field, actual, expected, false),
        CriterionOperator::Unsupported(raw) => Verdict::failed_closed(
            CriterionAnomaly::UnsupportedOperator,
            format!("operator '{raw}' is not supported"),
        ),
    }
}

fn single(expected: &CriterionValue) -> Option<&FieldValue> {
    match expected {
        CriterionValue::Single(value) => Some(value),
        CriterionValue::List(_) => None,
    }
}

fn describe(
    field: &str,
    actual: &FieldValue,
    matched: bool,
    holds: &str,
    fails: &str,
    expected: &CriterionValue,
) -> String {
    let relation = if matched { holds } else { fails };
    format!("{field} = {actual} ({relation} {expected})")
}

fn ordered(
    field: &str,
    actual: &FieldValue,
    expected: &CriterionValue,
    symbol: &str,
    cmp: impl Fn(f64, f64) -> bool,
) -> Verdict {
    let literal = single(expected).and_then(FieldValue::as_number);
    match (actual.as_number(), literal) {
        (Some(lhs), Some(rhs)) => {
            let matched = cmp(lhs, rhs);
            let relation = if matched {
                symbol.to_string()
            } else {
                format!("not {symbol}")
            };
            Verdict::outcome(matched, format!("{field} = {lhs} ({relation} {rhs})"))
        }
        _ => Verdict::failed_closed(
            CriterionAnomaly::NonNumericComparison,
            format!(
                "{field} = {actual} ({}) cannot be compared with {expected} using '{symbol}'",
                actual.kind()
            ),
        ),
    }
}

fn membership(
    field: &str,
    actual: &FieldValue,
    expected: &CriterionValue,
    wanted: bool,
) -> Verdict {
    let CriterionValue::List(values) = expected else {
        let operator = if wanted { "in" } else { "not_in" };
        return Verdict::failed_closed(
            CriterionAnomaly::ExpectedList,
            format!("operator '{operator}' requires a list literal, got {expected}"),
        );
    };

    let present = values.iter().any(|candidate| candidate == actual);
    let matched = present == wanted;
    let relation = if present { "in" } else { "not in" };
    Verdict::outcome(matched, format!("{field} = {actual} ({relation} [{expected}])"))
}
