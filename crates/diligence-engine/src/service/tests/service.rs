use super::common::*;
use crate::citations::{Claim, SupportStatus};
use crate::evidence::RawEvidence;
use crate::providers::IndexError;
use crate::scoring::{ScoringError, ThesisCriterion, ThesisDefinition, ThesisType};
use crate::scoring::Dimension;
use crate::service::repository::{RepositoryError, ScoreId, ScoreRepository};
use crate::service::{ScoreRequest, ServiceError};
use chrono::NaiveDate;
use std::sync::Arc;

fn preset_request() -> ScoreRequest {
    ScoreRequest {
        thesis_type: Some(ThesisType::DigitalTransformation),
        as_of: Some(as_of()),
        ..ScoreRequest::default()
    }
}

#[tokio::test]
async fn ingest_reports_accepted_and_rejected_records() {
    let (service, _) = build_service();

    let report = service.ingest(&evidence()).await.expect("ingests");

    assert_eq!(report.accepted, 3);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].id.as_deref(), Some("ev-broken"));
    assert_eq!(report.chunks, 3);
    assert_eq!(report.embedded, 3);
    assert!(!report.degraded);
    assert_eq!(service.evidence_count().expect("counts"), 3);
    assert_eq!(service.chunk_count().expect("counts"), 3);
}

#[tokio::test]
async fn reingesting_replaces_items_instead_of_duplicating() {
    let (service, _) = build_service();

    service.ingest(&evidence()).await.expect("ingests");
    service.ingest(&evidence()).await.expect("ingests again");

    assert_eq!(service.evidence_count().expect("counts"), 3);
    assert_eq!(service.chunk_count().expect("counts"), 3);
}

fn assert_send<T: Send>(_: &T) {}

#[test]
fn ingest_and_cite_futures_can_back_http_handlers() {
    let (service, _) = build_service();
    let records = evidence();
    let claims = vec![Claim::new("claim-1", "Company uses Kubernetes")];

    let ingest = service.ingest(&records);
    assert_send(&ingest);
    let cite = service.cite(&claims);
    assert_send(&cite);
}

#[tokio::test]
async fn unnamed_evidence_accumulates_across_batches() {
    let (service, _) = build_service();
    let unnamed = |url: &str, text: &str| RawEvidence {
        id: None,
        ..record("", "primary", url, "tech_stack", text)
    };

    service
        .ingest(&[
            unnamed("https://acme.io/stack", "Services run on Kubernetes."),
            unnamed("https://acme.io/data", "Analytics runs on ClickHouse."),
        ])
        .await
        .expect("ingests");
    service
        .ingest(&[unnamed("https://acme.io/ci", "Builds run on GitHub Actions.")])
        .await
        .expect("ingests again");

    assert_eq!(service.evidence_count().expect("counts"), 3);
    assert_eq!(service.chunk_count().expect("counts"), 3);
}

#[tokio::test]
async fn rescoring_without_as_of_is_identical() {
    let (service, _) = build_service();
    service.ingest(&evidence()).await.expect("ingests");
    let request = ScoreRequest {
        thesis_type: Some(ThesisType::DigitalTransformation),
        ..ScoreRequest::default()
    };

    let first = service.score(request.clone()).expect("scores");
    let second = service.score(request).expect("scores again");

    assert_ne!(first.score_id, second.score_id);
    assert_eq!(first.report.score, second.report.score);
    assert_eq!(first.as_of, second.as_of);
    assert_eq!(first.as_of.date_naive(), NaiveDate::from_ymd_opt(2025, 9, 1).expect("date"));
}

#[test]
fn counts_surface_a_broken_chunk_index() {
    let service = build_service_on(
        Arc::new(MemoryRepository::default()),
        None,
        Arc::new(PoisonedIndex),
    );

    assert!(matches!(
        service.chunk_count(),
        Err(ServiceError::Index(IndexError::Poisoned))
    ));
    assert_eq!(service.evidence_count().expect("counts"), 0);
}

#[tokio::test]
async fn score_uses_ingested_evidence_and_persists_the_record() {
    let (service, repository) = build_service();
    service.ingest(&evidence()).await.expect("ingests");

    let record = service.score(preset_request()).expect("scores");

    assert!(record.score_id.0.starts_with("score-"));
    assert_eq!(record.report.evidence.len(), 3);
    assert_eq!(record.thesis, ThesisDefinition::preset(ThesisType::DigitalTransformation));
    let stored = repository
        .fetch(&record.score_id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.report.score, record.report.score);

    let fetched = service.get_score(&record.score_id).expect("found");
    assert_eq!(fetched.score_id, record.score_id);
}

#[test]
fn score_prefers_inline_evidence() {
    let (service, _) = build_service();
    let request = ScoreRequest {
        evidence: Some(evidence()),
        ..preset_request()
    };

    let record = service.score(request).expect("scores");

    assert_eq!(record.report.evidence.len(), 3);
    assert_eq!(record.report.rejected.len(), 1);
    assert_eq!(service.evidence_count().expect("counts"), 0);
}

#[test]
fn score_rejects_invalid_theses() {
    let (service, repository) = build_service();
    let request = ScoreRequest {
        thesis: Some(ThesisDefinition {
            thesis_type: ThesisType::Custom,
            criteria: vec![
                ThesisCriterion::new("Platform", 60.0, Dimension::Technical),
                ThesisCriterion::new("Demand", 30.0, Dimension::Market),
            ],
        }),
        ..ScoreRequest::default()
    };

    match service.score(request) {
        Err(ServiceError::Scoring(ScoringError::InvalidThesisDefinition { .. })) => {}
        other => panic!("expected invalid thesis, got {other:?}"),
    }
    assert!(repository.recent(10).expect("lists").is_empty());
}

#[test]
fn score_requires_a_thesis() {
    let (service, _) = build_service();

    let err = service
        .score(ScoreRequest::default())
        .expect_err("no thesis supplied");
    assert!(matches!(err, ServiceError::InvalidRequest(_)));

    let custom = ScoreRequest {
        thesis_type: Some(ThesisType::Custom),
        ..ScoreRequest::default()
    };
    assert!(matches!(
        service.score(custom),
        Err(ServiceError::InvalidRequest(_))
    ));
}

#[test]
fn get_score_propagates_not_found() {
    let (service, _) = build_service();

    match service.get_score(&ScoreId("score-999999".to_string())) {
        Err(ServiceError::Repository(RepositoryError::NotFound)) => {}
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn repository_outages_surface_as_errors() {
    let service = build_service_with(Arc::new(UnavailableRepository), None);

    match service.score(preset_request()) {
        Err(ServiceError::Repository(RepositoryError::Unavailable(_))) => {}
        other => panic!("expected unavailable repository, got {other:?}"),
    }
}

#[tokio::test]
async fn cite_links_claims_to_supporting_chunks() {
    let (service, _) = build_service();
    service.ingest(&evidence()).await.expect("ingests");

    let report = service
        .cite(&[
            Claim::new("claim-1", "Company uses Kubernetes"),
            Claim::new("claim-2", "The company is profitable"),
        ])
        .await
        .expect("cites");

    assert_eq!(report.claims.len(), 2);
    assert_eq!(report.claims[0].claim_id, "claim-1");
    assert_eq!(report.claims[0].status, SupportStatus::Supported);
    assert_eq!(report.claims[0].citations[0].evidence_item_id.0, "ev-k8s");
    assert_eq!(report.claims[0].citations[0].chunk_id, "ev-k8s#0");
    assert_eq!(report.claims[1].status, SupportStatus::Unsupported);
    assert!(report.claims[1].citations.is_empty());
    assert_eq!((report.supported, report.unsupported), (1, 1));
    assert!(!report.degraded);
}

#[tokio::test]
async fn cite_without_reranker_is_degraded() {
    let service = build_service_with(Arc::new(MemoryRepository::default()), None);
    service.ingest(&evidence()).await.expect("ingests");

    let report = service
        .cite(&[Claim::new("claim-1", "Kubernetes clusters managed with Terraform")])
        .await
        .expect("cites");

    assert!(report.degraded);
    assert!(report.claims[0]
        .degradations
        .iter()
        .any(|reason| reason.contains("no reranker configured")));
}

#[tokio::test]
async fn cite_rejects_blank_claims() {
    let (service, _) = build_service();

    let err = service
        .cite(&[Claim::new("claim-1", "   ")])
        .await
        .expect_err("blank claim");
    assert!(matches!(err, ServiceError::InvalidRequest(_)));
}
