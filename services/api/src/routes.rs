use crate::infra::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Extension;
use axum::Json;
use diligence_engine::error::AppError;
use diligence_engine::service::{diligence_router, DiligenceService, ScoreRepository};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_diligence_routes<R>(service: Arc<DiligenceService<R>>) -> axum::Router
where
    R: ScoreRepository + 'static,
{
    let status = axum::Router::new()
        .route("/api/v1/status", get(status_endpoint::<R>))
        .with_state(service.clone());

    diligence_router(service)
        .merge(status)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
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

/// Counts of evidence items and indexed chunks held in memory.
pub(crate) async fn status_endpoint<R>(
    State(service): State<Arc<DiligenceService<R>>>,
) -> Result<Json<serde_json::Value>, AppError>
where
    R: ScoreRepository + 'static,
{
    Ok(Json(json!({
        "evidence_items": service.evidence_count()?,
        "indexed_chunks": service.chunk_count()?,
    })))
}
