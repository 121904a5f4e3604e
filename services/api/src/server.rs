use crate::cli::ServeArgs;
use crate::infra::{sample_rules, AppState, InMemoryRuleRepository};
use crate::routes::with_risk_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use psak_risk::config::AppConfig;
use psak_risk::error::AppError;
use psak_risk::staging::StagingService;
use psak_risk::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        engine: config.engine.clone(),
    };

    let rules = sample_rules();
    let seeded = rules.len();
    let repository = Arc::new(InMemoryRuleRepository::with_rules(rules));
    let staging_service = Arc::new(StagingService::new(repository));

    let app = with_risk_routes(staging_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        seeded_rules = seeded,
        policy = %config.engine.probability_policy,
        "credit-risk evaluation service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
