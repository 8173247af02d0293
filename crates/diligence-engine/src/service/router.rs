use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::repository::{ScoreId, ScoreRepository};
use super::{CitationRequest, DiligenceService, IngestRequest, ScoreRequest};
use crate::error::AppError;

/// Router builder exposing ingestion, scoring, and citation endpoints.
pub fn diligence_router<R>(service: Arc<DiligenceService<R>>) -> Router
where
    R: ScoreRepository + 'static,
{
    Router::new()
        .route("/api/v1/evidence", post(ingest_handler::<R>))
        .route("/api/v1/scores", post(score_handler::<R>))
        .route("/api/v1/scores/:score_id", get(score_status_handler::<R>))
        .route("/api/v1/citations", post(citation_handler::<R>))
        .with_state(service)
}

pub(crate) async fn ingest_handler<R>(
    State(service): State<Arc<DiligenceService<R>>>,
    axum::Json(request): axum::Json<IngestRequest>,
) -> Response
where
    R: ScoreRepository + 'static,
{
    match service.ingest(&request.evidence).await {
        Ok(report) if report.accepted == 0 && !request.evidence.is_empty() => {
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(report)).into_response()
        }
        Ok(report) => (StatusCode::ACCEPTED, axum::Json(report)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn score_handler<R>(
    State(service): State<Arc<DiligenceService<R>>>,
    axum::Json(request): axum::Json<ScoreRequest>,
) -> Response
where
    R: ScoreRepository + 'static,
{
    match service.score(request) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn score_status_handler<R>(
    State(service): State<Arc<DiligenceService<R>>>,
    Path(score_id): Path<String>,
) -> Response
where
    R: ScoreRepository + 'static,
{
    let id = ScoreId(score_id);
    match service.get_score(&id) {
        Ok(record) => (StatusCode::OK, axum::Json(record.summary_view())).into_response(),
        Err(err) => {
            let err = AppError::from(err);
            let payload = json!({
                "score_id": id.0,
                "error": err.to_string(),
            });
            (err.status(), axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn citation_handler<R>(
    State(service): State<Arc<DiligenceService<R>>>,
    axum::Json(request): axum::Json<CitationRequest>,
) -> Response
where
    R: ScoreRepository + 'static,
{
    if request.claims.is_empty() {
        let payload = json!({ "error": "at least one claim is required" });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    }

    match service.cite(&request.claims).await {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
