//! Token helpers shared by quality scoring, lexical retrieval, and classification.

use std::collections::BTreeSet;

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "are", "was", "were", "has", "have",
    "had", "its", "their", "our", "into", "over", "than", "then", "also", "but", "not", "all",
    "any", "can", "will", "uses", "use", "company", "which", "they", "them", "been", "being",
];

/// Lowercase alphanumeric tokens of at least two characters, stopwords removed.
pub fn content_tokens(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|ch: char| !ch.is_alphanumeric() && ch != '+' && ch != '#')
        .filter(|token| token.chars().count() >= 2)
        .filter(|token| !STOPWORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Jaccard overlap of two token sets.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    let union = a.union(b).count();
    shared as f64 / union as f64
}

/// Fraction of `query` tokens present in `document`.
pub fn coverage(query: &BTreeSet<String>, document: &BTreeSet<String>) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    query.intersection(document).count() as f64 / query.len() as f64
}

/// 64-bit FNV-1a digest. Stable across runs and platforms.
pub(crate) fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// Host of a source URL, used to judge independence between sources.
pub fn source_host(source_url: &str) -> Option<String> {
    let parsed = url::Url::parse(source_url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}
