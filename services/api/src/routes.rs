use crate::infra::{deserialize_date, AppState};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::NaiveDate;
use psak_risk::ecl::{portfolio_ecl, EclInput, EclResult};
use psak_risk::error::AppError;
use psak_risk::fla::{AdjustmentRequest, ProbabilityPolicy, ScenarioAdjuster, WeightedAdjustment};
use psak_risk::migration::{
    build_default_matrix, validate_with_tolerance, DefaultCurve, MatrixPeriod, MatrixStatistics,
    MatrixValidation, MigrationMatrix, MigrationMatrixEntry,
};
use psak_risk::staging::{staging_router, StagingRuleRepository, StagingService};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MatrixValidationRequest {
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) period_start: NaiveDate,
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) period_end: NaiveDate,
    pub(crate) entries: Vec<MigrationMatrixEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MatrixValidationResponse {
    pub(crate) validation: MatrixValidation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) statistics: Option<MatrixStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) rejection: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DefaultMatrixRequest {
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) period_start: NaiveDate,
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) period_end: NaiveDate,
    #[serde(default)]
    pub(crate) stay_probability: Option<f64>,
    #[serde(default)]
    pub(crate) horizon: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DefaultMatrixResponse {
    pub(crate) stay_probability: f64,
    pub(crate) entries: Vec<MigrationMatrixEntry>,
    pub(crate) statistics: MatrixStatistics,
    pub(crate) default_curves: Vec<DefaultCurve>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WeightedRequest {
    #[serde(flatten)]
    pub(crate) request: AdjustmentRequest,
    #[serde(default)]
    pub(crate) policy: Option<ProbabilityPolicy>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EclRequest {
    pub(crate) facilities: Vec<EclInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EclResponse {
    pub(crate) results: Vec<EclResult>,
    pub(crate) total_expected_credit_loss: f64,
}

const DEFAULT_CURVE_HORIZON: u32 = 5;

pub(crate) fn with_risk_routes<R>(service: Arc<StagingService<R>>) -> axum::Router
where
    R: StagingRuleRepository + 'static,
{
    staging_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/migration/validate",
            axum::routing::post(matrix_validation_endpoint),
        )
        .route(
            "/api/v1/migration/default",
            axum::routing::post(default_matrix_endpoint),
        )
        .route("/api/v1/fla/weighted", axum::routing::post(weighted_endpoint))
        .route("/api/v1/ecl/calculate", axum::routing::post(ecl_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Row-sum report for one period. Statistics are only attached when the
/// period forms a complete, balanced matrix.
pub(crate) async fn matrix_validation_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<MatrixValidationRequest>,
) -> Result<Json<MatrixValidationResponse>, AppError> {
    let period = MatrixPeriod::new(payload.period_start, payload.period_end);
    let tolerance = state.engine.matrix_tolerance;
    let validation = validate_with_tolerance(&payload.entries, &period, tolerance);

    let (statistics, rejection) =
        match MigrationMatrix::from_entries_with_tolerance(&payload.entries, period, tolerance) {
            Ok(matrix) => (Some(matrix.statistics()), None),
            Err(err) => {
                debug!(%period, error = %err, "matrix not usable for estimation");
                (None, Some(err.to_string()))
            }
        };

    Ok(Json(MatrixValidationResponse {
        validation,
        statistics,
        rejection,
    }))
}

pub(crate) async fn default_matrix_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<DefaultMatrixRequest>,
) -> Result<Json<DefaultMatrixResponse>, AppError> {
    let stay_probability = payload
        .stay_probability
        .unwrap_or(state.engine.default_stay_probability);
    let period = MatrixPeriod::new(payload.period_start, payload.period_end);
    let matrix = build_default_matrix(period, stay_probability)?;
    let default_curves =
        matrix.default_term_structure(payload.horizon.unwrap_or(DEFAULT_CURVE_HORIZON))?;

    Ok(Json(DefaultMatrixResponse {
        stay_probability,
        entries: matrix.to_entries(),
        statistics: matrix.statistics(),
        default_curves,
    }))
}

pub(crate) async fn weighted_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<WeightedRequest>,
) -> Result<Json<WeightedAdjustment>, AppError> {
    let policy = payload.policy.unwrap_or(state.engine.probability_policy);
    let result = ScenarioAdjuster::new(policy).apply(&payload.request)?;

    if !result.warnings.is_empty() {
        warn!(
            segment = %result.segment,
            warnings = result.warnings.len(),
            "scenario weighting produced warnings"
        );
    }

    Ok(Json(result))
}

pub(crate) async fn ecl_endpoint(
    Json(payload): Json<EclRequest>,
) -> Result<Json<EclResponse>, AppError> {
    let (results, total_expected_credit_loss) = portfolio_ecl(&payload.facilities)?;
    Ok(Json(EclResponse {
        results,
        total_expected_credit_loss,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{sample_rules, test_state, InMemoryRuleRepository};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn router() -> axum::Router {
        let repository = Arc::new(InMemoryRuleRepository::with_rules(sample_rules()));
        let service = Arc::new(StagingService::new(repository));
        with_risk_routes(service).layer(Extension(test_state()))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds")
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn row(from: &str, probabilities: [f64; 5]) -> Vec<serde_json::Value> {
        probabilities
            .iter()
            .enumerate()
            .map(|(index, probability)| {
                json!({
                    "periodStart": "2024-01-01",
                    "periodEnd": "2024-12-31",
                    "fromState": from,
                    "toState": (index + 1).to_string(),
                    "probability": probability,
                })
            })
            .collect()
    }

    #[tokio::test]
    async fn health_and_ready_report_ok() {
        let health = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);

        let ready = router()
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ready.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn assess_uses_seeded_rule_book() {
        let response = router()
            .oneshot(post_json(
                "/api/v1/staging/assess",
                json!({ "transactionId": "F-1", "attributes": { "dpd": 12, "collectibility": "3" } }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["stage"], "Stage 3");
        assert_eq!(body["ruleId"], "impaired-collectibility");
    }

    #[tokio::test]
    async fn matrix_validation_reports_imbalance() {
        let response = router()
            .oneshot(post_json(
                "/api/v1/migration/validate",
                json!({
                    "periodStart": "2024-01-01",
                    "periodEnd": "2024-12-31",
                    "entries": row("1", [0.8, 0.2, 0.05, 0.03, 0.02]),
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["validation"]["imbalances"][0]["fromState"], "1");
        assert!(body.get("statistics").is_none());
        assert!(body["rejection"]
            .as_str()
            .unwrap_or_default()
            .contains("unbalanced"));
    }

    #[tokio::test]
    async fn default_matrix_returns_balanced_entries() {
        let Json(body) = default_matrix_endpoint(
            Extension(test_state()),
            Json(DefaultMatrixRequest {
                period_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                period_end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
                stay_probability: None,
                horizon: Some(2),
            }),
        )
        .await
        .expect("default matrix");

        assert_eq!(body.stay_probability, 0.8);
        assert_eq!(body.entries.len(), 25);
        assert_eq!(body.default_curves[0].cumulative.len(), 2);
    }

    #[tokio::test]
    async fn default_matrix_rejects_invalid_stay() {
        let response = router()
            .oneshot(post_json(
                "/api/v1/migration/default",
                json!({ "periodStart": "2024-01-01", "periodEnd": "2024-12-31", "stayProbability": 1.5 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn default_matrix_body_uses_camel_case_keys() {
        let response = router()
            .oneshot(post_json(
                "/api/v1/migration/default",
                json!({ "periodStart": "2024-01-01", "periodEnd": "2024-12-31", "horizon": 1 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["stayProbability"], 0.8);
        assert_eq!(body["entries"][0]["fromState"], "1");
        assert_eq!(body["defaultCurves"][0]["fromState"], "1");
        assert!(body["statistics"]["averageStay"].is_number());
        assert!(body.get("default_curves").is_none());
    }

    #[tokio::test]
    async fn default_matrix_rejects_oversized_horizon() {
        let response = router()
            .oneshot(post_json(
                "/api/v1/migration/default",
                json!({ "periodStart": "2024-01-01", "periodEnd": "2024-12-31", "horizon": 20_000 }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn weighted_endpoint_applies_policy_override() {
        let request = json!({
            "basePd": 0.8,
            "baseLgd": 0.4,
            "scenarios": [{ "id": "sev", "name": "Severe", "type": "Severe", "probability": 1.0 }],
            "adjustments": [{ "scenarioId": "sev", "segment": "All", "pdAdjustmentFactor": 2.0, "lgdAdjustmentFactor": 1.0 }],
        });

        let clamped = router()
            .oneshot(post_json("/api/v1/fla/weighted", request.clone()))
            .await
            .unwrap();
        assert_eq!(clamped.status(), StatusCode::OK);
        let body = json_body(clamped).await;
        assert_eq!(body["weightedPd"], 1.0);
        assert_eq!(body["warnings"][0]["kind"], "out_of_range_probability");
        assert_eq!(body["warnings"][0]["scenarioId"], "sev");
        assert_eq!(body["perScenario"][0]["factorSource"], "all_segments");

        let mut strict = request;
        strict["policy"] = json!("reject");
        let rejected = router()
            .oneshot(post_json("/api/v1/fla/weighted", strict))
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn ecl_endpoint_totals_facilities() {
        let response = router()
            .oneshot(post_json(
                "/api/v1/ecl/calculate",
                json!({
                    "facilities": [
                        { "stage": "Stage 1", "exposureAtDefault": 1000.0, "pd12Month": 0.02, "pdLifetime": 0.1, "lgd": 0.5 },
                        { "stage": "Stage 3", "exposureAtDefault": 1000.0, "pd12Month": 0.02, "pdLifetime": 0.1, "lgd": 0.5 }
                    ]
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let total = body["totalExpectedCreditLoss"].as_f64().unwrap_or_default();
        assert!((total - 510.0).abs() < 1e-9);
    }
}
