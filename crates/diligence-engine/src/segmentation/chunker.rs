use serde::{Deserialize, Serialize};

use crate::scoring::{EvidenceCategory, EvidenceId, EvidenceItem, SourceType};

/// Bounded span of an evidence item's text, the unit of semantic retrieval.
///
/// Offsets are byte positions into the owning item's text; `text` is exactly that slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceChunk {
    pub id: String,
    pub evidence_item_id: EvidenceId,
    pub index: usize,
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub category: EvidenceCategory,
    pub source_type: SourceType,
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Cuts an item into chunks of at most `max_chars` characters.
pub fn segment_item(item: &EvidenceItem, max_chars: usize) -> Vec<EvidenceChunk> {
    split_spans(&item.text, max_chars)
        .into_iter()
        .enumerate()
        .map(|(index, (start, end))| EvidenceChunk {
            id: format!("{}#{}", item.id, index),
            evidence_item_id: item.id.clone(),
            index,
            text: item.text[start..end].to_string(),
            start_offset: start,
            end_offset: end,
            category: item.category,
            source_type: item.source_type,
            source_url: (!item.source_url.is_empty()).then(|| item.source_url.clone()),
            embedding: None,
        })
        .collect()
}

/// Byte spans covering every non-whitespace run of `text`.
///
/// Prefers a paragraph break, then a sentence end, then any whitespace, as long as the
/// cut lands in the last two thirds of the window; otherwise cuts hard at the limit.
pub fn split_spans(text: &str, max_chars: usize) -> Vec<(usize, usize)> {
    let max_chars = max_chars.max(1);
    let mut spans = Vec::new();
    let mut start = skip_whitespace(text, 0);

    while start < text.len() {
        let window_end = advance_chars(text, start, max_chars);
        let cut = if window_end >= text.len() {
            text.len()
        } else {
            boundary(text, start, window_end)
        };
        let end = start + text[start..cut].trim_end().len();
        if end > start {
            spans.push((start, end));
        }
        start = skip_whitespace(text, cut);
    }

    spans
}

fn advance_chars(text: &str, start: usize, count: usize) -> usize {
    text[start..]
        .char_indices()
        .nth(count)
        .map(|(offset, _)| start + offset)
        .unwrap_or(text.len())
}

fn skip_whitespace(text: &str, from: usize) -> usize {
    text[from..]
        .char_indices()
        .find(|(_, ch)| !ch.is_whitespace())
        .map(|(offset, _)| from + offset)
        .unwrap_or(text.len())
}

fn boundary(text: &str, start: usize, window_end: usize) -> usize {
    let window = &text[start..window_end];
    let floor = window.len() / 3;

    if let Some(pos) = window.rfind("\n\n").filter(|pos| *pos >= floor) {
        return start + pos + 2;
    }

    let sentence_end = window
        .char_indices()
        .filter(|(_, ch)| matches!(ch, '.' | '!' | '?'))
        .map(|(offset, ch)| offset + ch.len_utf8())
        .filter(|after| {
            text[start + after..]
                .chars()
                .next()
                .map_or(true, char::is_whitespace)
        })
        .last();
    if let Some(after) = sentence_end.filter(|after| *after >= floor) {
        return start + after;
    }

    if let Some((pos, _)) = window
        .char_indices()
        .filter(|(_, ch)| ch.is_whitespace())
        .last()
        .filter(|(pos, _)| *pos >= floor)
    {
        return start + pos;
    }

    window_end
}
