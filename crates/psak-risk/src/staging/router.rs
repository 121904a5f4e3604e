use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{EvaluationContext, StagingRule, TransactionProfile};
use super::engine::evaluate;
use super::repository::{RuleWrite, StagingRuleRepository};
use super::service::{StagingService, StagingServiceError};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub rules: Vec<StagingRule>,
    pub context: EvaluationContext,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub transactions: Vec<TransactionProfile>,
}

/// Router builder exposing the rule editor, assessment, and simulator.
pub fn staging_router<R>(service: Arc<StagingService<R>>) -> Router
where
    R: StagingRuleRepository + 'static,
{
    Router::new()
        .route("/api/v1/staging/evaluate", post(evaluate_handler))
        .route("/api/v1/staging/rules", get(list_rules_handler::<R>))
        .route(
            "/api/v1/staging/rules/:rule_id",
            put(save_rule_handler::<R>).delete(remove_rule_handler::<R>),
        )
        .route(
            "/api/v1/staging/rules/:rule_id/activation",
            post(activation_handler::<R>),
        )
        .route("/api/v1/staging/assess", post(assess_handler::<R>))
        .route("/api/v1/staging/simulate", post(simulate_handler::<R>))
        .with_state(service)
}

/// Stateless evaluation of caller-supplied rules; an unassigned stage is
/// reported in the body rather than as an error so the trace stays visible.
pub(crate) async fn evaluate_handler(Json(request): Json<EvaluateRequest>) -> Response {
    let evaluation = evaluate(&request.rules, &request.context);
    (StatusCode::OK, Json(evaluation)).into_response()
}

pub(crate) async fn list_rules_handler<R>(
    State(service): State<Arc<StagingService<R>>>,
) -> Response
where
    R: StagingRuleRepository + 'static,
{
    match service.rules() {
        Ok(rules) => (StatusCode::OK, Json(rules)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn save_rule_handler<R>(
    State(service): State<Arc<StagingService<R>>>,
    Path(rule_id): Path<String>,
    Json(rule): Json<StagingRule>,
) -> Response
where
    R: StagingRuleRepository + 'static,
{
    if rule.id != rule_id {
        let payload = json!({
            "error": format!("rule id '{}' does not match path '{}'", rule.id, rule_id),
        });
        return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
    }

    match service.save_rule(rule.clone()) {
        Ok(RuleWrite::Created) => (StatusCode::CREATED, Json(rule)).into_response(),
        Ok(RuleWrite::Updated) => (StatusCode::OK, Json(rule)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn activation_handler<R>(
    State(service): State<Arc<StagingService<R>>>,
    Path(rule_id): Path<String>,
    Json(request): Json<ActivationRequest>,
) -> Response
where
    R: StagingRuleRepository + 'static,
{
    match service.set_active(&rule_id, request.is_active) {
        Ok(rule) => (StatusCode::OK, Json(rule)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn remove_rule_handler<R>(
    State(service): State<Arc<StagingService<R>>>,
    Path(rule_id): Path<String>,
) -> Response
where
    R: StagingRuleRepository + 'static,
{
    match service.remove_rule(&rule_id) {
        Ok(rule) => (StatusCode::OK, Json(rule)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn assess_handler<R>(
    State(service): State<Arc<StagingService<R>>>,
    Json(transaction): Json<TransactionProfile>,
) -> Response
where
    R: StagingRuleRepository + 'static,
{
    match service.assess(&transaction) {
        Ok(assessment) => (StatusCode::OK, Json(assessment)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn simulate_handler<R>(
    State(service): State<Arc<StagingService<R>>>,
    Json(request): Json<SimulateRequest>,
) -> Response
where
    R: StagingRuleRepository + 'static,
{
    match service.simulate(&request.transactions) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: StagingServiceError) -> Response {
    AppError::from(err).into_response()
}
