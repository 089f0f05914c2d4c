//! Hybrid scoring and question-answering context assembly.

use crate::error::MemoryError;
use crate::model::{MemoryRecord, SearchHit, format_timestamp};
use crate::provider::HybridSearch;
use serde::Serialize;
use std::collections::HashSet;

/// Text returned by [`format_context`] when nothing was retrieved.
pub const NO_CONTEXT: &str = "No relevant memories found.";

/// Fraction of distinct query words present in `content`.
///
/// Case-insensitive and whitespace-split; an empty query scores 0.
pub fn keyword_overlap(query: &str, content: &str) -> f32 {
    let query_words: HashSet<String> = query.split_whitespace().map(str::to_lowercase).collect();
    if query_words.is_empty() {
        return 0.0;
    }
    let content_words: HashSet<String> =
        content.split_whitespace().map(str::to_lowercase).collect();
    let matched = query_words.intersection(&content_words).count();
    matched as f32 / query_words.len() as f32
}

/// Rescore vector hits as `(1 - w) * similarity + w * overlap`, sort
/// descending and keep `limit`.
pub fn hybrid_rescore(
    hits: Vec<SearchHit>,
    query: &str,
    keyword_weight: f32,
    limit: usize,
) -> Vec<SearchHit> {
    let mut rescored: Vec<SearchHit> = hits
        .into_iter()
        .map(|hit| {
            let keyword = keyword_overlap(query, &hit.record.content);
            let combined = (1.0 - keyword_weight) * hit.similarity_score + keyword_weight * keyword;
            SearchHit {
                keyword_score: Some(keyword),
                combined_score: combined,
                ..hit
            }
        })
        .collect();
    rescored.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
    rescored.truncate(limit);
    rescored
}

/// Knobs for context assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextPolicy {
    /// Hybrid search limit.
    pub candidate_limit: usize,
    /// Most recent records merged in when absent from the hits.
    pub recent_count: usize,
    /// Entries kept after re-ranking.
    pub window: usize,
    /// Multiplier applied to vector relevance.
    pub relevance_weight: f32,
    /// Flat boost for voice-transcribed records.
    pub voice_boost: f32,
    /// Keyword weight passed to hybrid search.
    pub keyword_weight: f32,
}

impl Default for ContextPolicy {
    fn default() -> Self {
        Self {
            candidate_limit: 10,
            recent_count: 3,
            window: 7,
            relevance_weight: 2.0,
            voice_boost: 1.0,
            keyword_weight: 0.3,
        }
    }
}

/// A record selected for the answer context.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContextEntry {
    pub record: MemoryRecord,
    /// Vector similarity; 0 for records merged in by recency.
    pub relevance: f32,
    /// Ranking key.
    pub score: f32,
}

/// Select the records handed to answer generation.
///
/// Runs hybrid search, appends recent records missing from the hits, then
/// stable-sorts by `relevance * relevance_weight + voice_boost` (boost only
/// for voice-transcribed records) and keeps `window` entries.
pub fn assemble_context<P>(
    provider: &P,
    question: &str,
    policy: &ContextPolicy,
) -> Result<Vec<ContextEntry>, MemoryError>
where
    P: HybridSearch + ?Sized,
{
    let hits = provider.hybrid_search(question, policy.candidate_limit, policy.keyword_weight)?;
    let recent = if policy.recent_count > 0 {
        provider.recent_memories(policy.recent_count)?
    } else {
        Vec::new()
    };
    Ok(rank_context(hits, recent, policy))
}

/// Pure ranking step of [`assemble_context`].
pub fn rank_context(
    hits: Vec<SearchHit>,
    recent: Vec<MemoryRecord>,
    policy: &ContextPolicy,
) -> Vec<ContextEntry> {
    let mut seen: HashSet<uuid::Uuid> = HashSet::new();
    let mut merged: Vec<(MemoryRecord, f32)> = Vec::new();
    for hit in hits {
        if seen.insert(hit.record.id) {
            merged.push((hit.record, hit.similarity_score));
        }
    }
    for record in recent {
        if seen.insert(record.id) {
            merged.push((record, 0.0));
        }
    }

    let mut entries: Vec<ContextEntry> = merged
        .into_iter()
        .map(|(record, relevance)| {
            let boost = if record.is_voice_transcribed() {
                policy.voice_boost
            } else {
                0.0
            };
            ContextEntry {
                score: relevance * policy.relevance_weight + boost,
                relevance,
                record,
            }
        })
        .collect();
    entries.sort_by(|a, b| b.score.total_cmp(&a.score));
    entries.truncate(policy.window);
    entries
}

/// Render one context line.
pub fn format_entry(record: &MemoryRecord) -> String {
    let timestamp = format_timestamp(&record.timestamp);
    match record.source_label() {
        Some(source) => format!("[{source}] Memory from {timestamp}: {}", record.content),
        None => format!("Memory from {timestamp}: {}", record.content),
    }
}

/// Render the context block, separating entries with blank lines.
pub fn format_context(entries: &[ContextEntry]) -> String {
    if entries.is_empty() {
        return NO_CONTEXT.to_string();
    }
    entries
        .iter()
        .map(|entry| format_entry(&entry.record))
        .collect::<Vec<_>>()
        .join("\n\n")
}
