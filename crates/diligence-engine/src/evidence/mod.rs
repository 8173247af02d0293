//! Intake of collector exports: parsing raw records and normalizing them into evidence items.

pub mod normalizer;
mod parser;

pub use normalizer::{normalize_batch, MalformedEvidence, NormalizedBatch, RawEvidence};
pub use parser::{EvidenceImportError, EvidenceImporter};
