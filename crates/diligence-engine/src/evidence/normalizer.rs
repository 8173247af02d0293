use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::scoring::domain::{EvidenceCategory, EvidenceId, EvidenceItem, SourceType};
use crate::text::fnv1a;

/// Evidence record as emitted by an upstream collector; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvidence {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub id: Option<String>,
    #[serde(
        default,
        alias = "sourceType",
        deserialize_with = "empty_string_as_none"
    )]
    pub source_type: Option<String>,
    #[serde(
        default,
        alias = "sourceUrl",
        alias = "url",
        deserialize_with = "empty_string_as_none"
    )]
    pub source_url: Option<String>,
    #[serde(default, alias = "type", deserialize_with = "empty_string_as_none")]
    pub category: Option<String>,
    #[serde(
        default,
        alias = "content",
        alias = "summary",
        deserialize_with = "empty_string_as_none"
    )]
    pub text: Option<String>,
    #[serde(
        default,
        alias = "collectedAt",
        alias = "timestamp",
        deserialize_with = "empty_string_as_none"
    )]
    pub collected_at: Option<String>,
}

/// A record that could not be turned into evidence. Non-fatal for the batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("malformed evidence at index {index}: {reason}")]
pub struct MalformedEvidence {
    pub index: usize,
    pub id: Option<String>,
    pub reason: String,
}

/// Outcome of normalizing a collector batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBatch {
    pub items: Vec<EvidenceItem>,
    pub rejected: Vec<MalformedEvidence>,
}

/// Converts raw records into evidence items, dropping the malformed ones.
pub fn normalize_batch(records: &[RawEvidence]) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();

    let mut seen: HashSet<String> = HashSet::new();
    for (index, record) in records.iter().enumerate() {
        match normalize_record(index, record) {
            Ok(mut item) => {
                if record.id.is_none() && !seen.insert(item.id.0.clone()) {
                    item.id.0 = format!("{}-{index}", item.id.0);
                }
                batch.items.push(item);
            }
            Err(rejection) => {
                warn!(index, reason = %rejection.reason, "dropping malformed evidence");
                batch.rejected.push(rejection);
            }
        }
    }

    debug!(
        accepted = batch.items.len(),
        rejected = batch.rejected.len(),
        "normalized evidence batch"
    );
    batch
}

fn normalize_record(index: usize, record: &RawEvidence) -> Result<EvidenceItem, MalformedEvidence> {
    let reject = |reason: String| MalformedEvidence {
        index,
        id: record.id.clone(),
        reason,
    };

    let text = record
        .text
        .as_deref()
        .map(collapse_whitespace)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| reject("missing text".to_string()))?;

    let raw_source = record
        .source_type
        .as_deref()
        .ok_or_else(|| reject("missing source type".to_string()))?;
    let source_type = SourceType::parse(raw_source)
        .ok_or_else(|| reject(format!("unrecognised source type '{raw_source}'")))?;

    let collected_at = record.collected_at.as_deref().and_then(|value| {
        let parsed = parse_timestamp(value);
        if parsed.is_none() {
            debug!(index, value, "ignoring unparseable collection timestamp");
        }
        parsed
    });

    let source_url = record
        .source_url
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    let id = match record.id.as_deref() {
        Some(id) => id.trim().to_string(),
        None => content_id(&source_url, &text),
    };

    Ok(EvidenceItem {
        id: EvidenceId(id),
        source_type,
        source_url,
        category: record
            .category
            .as_deref()
            .map(EvidenceCategory::parse)
            .unwrap_or(EvidenceCategory::Unclassified),
        text,
        collected_at,
        quality_score: 0.0,
    })
}

/// Id for a record the collector left unnamed, derived from where it came from and what it says.
fn content_id(source_url: &str, text: &str) -> String {
    let digest = fnv1a(format!("{source_url}\n{text}").as_bytes());
    format!("evidence-{digest:016x}")
}

/// Collapses runs of whitespace within lines while keeping paragraph breaks.
pub(crate) fn collapse_whitespace(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    cleaned
        .split("\n\n")
        .map(|paragraph| paragraph.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|paragraph| !paragraph.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(text: Option<&str>, source_type: Option<&str>) -> RawEvidence {
        RawEvidence {
            id: Some("ev-1".to_string()),
            source_type: source_type.map(str::to_string),
            source_url: Some(" https://acme.io/stack ".to_string()),
            category: Some("tech_stack".to_string()),
            text: text.map(str::to_string),
            collected_at: Some("2025-06-01".to_string()),
        }
    }

    #[test]
    fn rejects_records_without_text_or_source_type() {
        let batch = normalize_batch(&[
            raw(None, Some("primary")),
            raw(Some("   "), Some("primary")),
            raw(Some("Runs on Kubernetes"), None),
            raw(Some("Runs on Kubernetes"), Some("rumour")),
            raw(Some("Runs on Kubernetes"), Some("Primary")),
        ]);

        assert_eq!(batch.items.len(), 1);
        assert_eq!(batch.rejected.len(), 4);
        assert_eq!(batch.rejected[0].reason, "missing text");
        assert_eq!(batch.rejected[2].reason, "missing source type");
        assert!(batch.rejected[3].reason.contains("rumour"));
        assert!(batch.rejected[0].to_string().contains("index 0"));
    }

    #[test]
    fn fills_defaults_and_cleans_fields() {
        let mut record = raw(Some("Runs   on\tKubernetes\n\n\nand Terraform"), Some("secondary"));
        record.id = None;
        record.category = Some("press-release".to_string());
        let batch = normalize_batch(&[record]);
        let item = &batch.items[0];

        assert!(item.id.0.starts_with("evidence-"));
        assert_eq!(item.id.0.len(), "evidence-".len() + 16);
        assert_eq!(item.source_url, "https://acme.io/stack");
        assert_eq!(item.category, EvidenceCategory::Unclassified);
        assert_eq!(item.text, "Runs on Kubernetes\n\nand Terraform");
        assert_eq!(
            item.collected_at.map(|dt| dt.date_naive()),
            NaiveDate::from_ymd_opt(2025, 6, 1)
        );
    }

    #[test]
    fn unnamed_records_get_content_derived_ids() {
        let unnamed = |url: &str, text: &str| RawEvidence {
            source_type: Some("primary".to_string()),
            source_url: Some(url.to_string()),
            text: Some(text.to_string()),
            ..RawEvidence::default()
        };
        let first = normalize_batch(&[
            unnamed("https://acme.io/a", "Runs on Kubernetes"),
            unnamed("https://acme.io/b", "Raised a Series B"),
        ]);
        let second = normalize_batch(&[unnamed("https://acme.io/c", "Hiring 40 engineers")]);
        let repeat = normalize_batch(&[unnamed("https://acme.io/a", "Runs on Kubernetes")]);

        assert_ne!(first.items[0].id, second.items[0].id);
        assert_ne!(first.items[1].id, first.items[0].id);
        assert_eq!(repeat.items[0].id, first.items[0].id);

        let duplicated = normalize_batch(&[
            unnamed("https://acme.io/a", "Runs on Kubernetes"),
            unnamed("https://acme.io/a", "Runs on Kubernetes"),
        ]);
        assert_eq!(duplicated.items[1].id.0, format!("{}-1", duplicated.items[0].id.0));
    }

    #[test]
    fn accepts_camel_case_collector_payloads() {
        let records: Vec<RawEvidence> = serde_json::from_str(
            r#"[{"sourceType": "tertiary", "sourceUrl": "https://news.example/acme",
                 "type": "funding_history", "content": "Raised $40M Series B",
                 "collectedAt": "2025-03-04T10:00:00Z"}]"#,
        )
        .expect("payload parses");
        let batch = normalize_batch(&records);
        assert_eq!(batch.items[0].category, EvidenceCategory::FundingHistory);
        assert_eq!(batch.items[0].source_type, SourceType::Tertiary);
        assert!(batch.items[0].collected_at.is_some());
    }

    #[test]
    fn parses_rfc3339_and_plain_dates() {
        assert!(parse_timestamp("2025-09-25T12:15:00Z").is_some());
        assert!(parse_timestamp("2025-09-25").is_some());
        assert!(parse_timestamp("last tuesday").is_none());
    }
}
