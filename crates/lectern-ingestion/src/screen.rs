//! Relevance screening: rescore candidates against a query and partition by
//! threshold. No I/O beyond candidate resolution.

use serde::Serialize;
use tracing::{instrument, warn};

use lectern_common::error::Result;

use crate::cache::CandidateCache;
use crate::models::CandidateSummary;
use crate::openalex::OpenAlexClient;
use crate::resolve::resolve_candidate;
use crate::text::relevance;

#[derive(Debug, Serialize)]
pub struct ScreenReport {
    pub relevant: Vec<CandidateSummary>,
    pub irrelevant: Vec<CandidateSummary>,
    pub relevant_count: usize,
    pub irrelevant_count: usize,
    /// Identifiers whose resolution failed; the rest of the pass continues.
    pub errors: Vec<String>,
}

/// Re-resolve every identifier, rescore against `query`, write the new score
/// back to the cache, and partition inclusively (`score >= threshold`).
#[instrument(skip(client, cache, candidate_ids), fields(n_ids = candidate_ids.len()))]
pub async fn run_screen(
    client: &OpenAlexClient,
    cache: &CandidateCache,
    query: &str,
    candidate_ids: &[String],
    threshold: f64,
) -> Result<ScreenReport> {
    let mut relevant = Vec::new();
    let mut irrelevant = Vec::new();
    let mut errors = Vec::new();

    for id in candidate_ids {
        let mut candidate = match resolve_candidate(client, cache, id, query).await {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(id = %id, error = %e, "Screening skipped unresolvable candidate");
                errors.push(format!("{id}: {e}"));
                continue;
            }
        };

        let scored = relevance(query, &candidate.title, &candidate.abstract_text);
        candidate.score = scored.score;
        candidate.score_reasons = scored.reasons;
        cache.insert(candidate.clone());

        if candidate.score >= threshold {
            relevant.push(candidate.summary());
        } else {
            irrelevant.push(candidate.summary());
        }
    }

    Ok(ScreenReport {
        relevant_count: relevant.len(),
        irrelevant_count: irrelevant.len(),
        relevant,
        irrelevant,
        errors,
    })
}
