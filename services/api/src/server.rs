use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryScoreRepository};
use crate::routes::with_diligence_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use diligence_engine::config::AppConfig;
use diligence_engine::error::AppError;
use diligence_engine::service::DiligenceService;
use diligence_engine::telemetry;
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

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryScoreRepository::default());
    let service = Arc::new(DiligenceService::from_config(repository, &config)?);

    let app = with_diligence_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "diligence engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
