use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::normalizer::RawEvidence;

#[derive(Debug)]
pub enum EvidenceImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    UnsupportedFormat(String),
}

impl std::fmt::Display for EvidenceImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvidenceImportError::Io(err) => write!(f, "failed to read evidence export: {}", err),
            EvidenceImportError::Csv(err) => write!(f, "invalid evidence CSV data: {}", err),
            EvidenceImportError::Json(err) => write!(f, "invalid evidence JSON data: {}", err),
            EvidenceImportError::UnsupportedFormat(ext) => {
                write!(f, "unsupported evidence export format '{}'", ext)
            }
        }
    }
}

impl std::error::Error for EvidenceImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvidenceImportError::Io(err) => Some(err),
            EvidenceImportError::Csv(err) => Some(err),
            EvidenceImportError::Json(err) => Some(err),
            EvidenceImportError::UnsupportedFormat(_) => None,
        }
    }
}

impl From<std::io::Error> for EvidenceImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for EvidenceImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<serde_json::Error> for EvidenceImportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

/// Reads collector exports into raw evidence records.
pub struct EvidenceImporter;

impl EvidenceImporter {
    /// Dispatches on the file extension (`.csv` or `.json`).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RawEvidence>, EvidenceImportError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let reader = BufReader::new(File::open(path)?);

        match extension.as_str() {
            "csv" => Self::from_csv_reader(reader),
            "json" => Self::from_json_reader(reader),
            other => Err(EvidenceImportError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Expects headers `id,source_type,source_url,category,text,collected_at`.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Vec<RawEvidence>, EvidenceImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let mut records = Vec::new();

        for record in csv_reader.deserialize::<RawEvidence>() {
            records.push(record?);
        }

        Ok(records)
    }

    /// Expects a JSON array of evidence objects.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Vec<RawEvidence>, EvidenceImportError> {
        Ok(serde_json::from_reader(reader)?)
    }
}
