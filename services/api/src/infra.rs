use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use diligence_engine::citations::Claim;
use diligence_engine::error::AppError;
use diligence_engine::scoring::ThesisType;
use diligence_engine::service::{RepositoryError, ScoreId, ScoreRecord, ScoreRepository};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryScoreRepository {
    records: Arc<Mutex<BTreeMap<ScoreId, ScoreRecord>>>,
}

fn poisoned() -> RepositoryError {
    RepositoryError::Unavailable("repository mutex poisoned".to_string())
}

impl ScoreRepository for InMemoryScoreRepository {
    fn insert(&self, record: ScoreRecord) -> Result<ScoreRecord, RepositoryError> {
        let mut guard = self.records.lock().map_err(|_| poisoned())?;
        if guard.contains_key(&record.score_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.score_id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &ScoreId) -> Result<Option<ScoreRecord>, RepositoryError> {
        let guard = self.records.lock().map_err(|_| poisoned())?;
        Ok(guard.get(id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<ScoreRecord>, RepositoryError> {
        let guard = self.records.lock().map_err(|_| poisoned())?;
        Ok(guard.values().rev().take(limit).cloned().collect())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Midnight UTC on the given day.
pub(crate) fn parse_as_of(raw: &str) -> Result<DateTime<Utc>, String> {
    let date = parse_date(raw)?;
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| format!("'{raw}' has no midnight"))
}

pub(crate) fn parse_thesis_type(raw: &str) -> Result<ThesisType, String> {
    ThesisType::parse(raw).ok_or_else(|| {
        format!(
            "unknown thesis type '{raw}' (expected accelerate-organic-growth, buy-and-build, digital-transformation)"
        )
    })
}

/// Claims from a JSON array of `{id, text}` objects, or one claim per non-empty line.
pub(crate) fn load_claims(path: &Path) -> Result<Vec<Claim>, AppError> {
    let raw = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        return Ok(serde_json::from_str(&raw)?);
    }
    Ok(claims_from_lines(&raw))
}

pub(crate) fn claims_from_lines(raw: &str) -> Vec<Claim> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, line)| Claim::new(format!("claim-{}", index + 1), line))
        .collect()
}
