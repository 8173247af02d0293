//! Claim-to-evidence citation matching.
//!
//! Each claim walks embedding, retrieval, reranking, selection, and classification. A failing
//! embedding or rerank service degrades the claim's result instead of failing it.

mod classify;
pub mod domain;
mod matcher;

pub use classify::classify;
pub use domain::{Citation, CitationClass, Claim, ClaimCitations, RetrievalMode, SupportStatus};
pub use matcher::{CitationMatcher, CitationSettings};
