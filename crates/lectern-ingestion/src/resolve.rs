//! Candidate resolution: cache first, then a single OpenAlex fetch.

use lectern_common::error::Result;

use crate::cache::CandidateCache;
use crate::models::Candidate;
use crate::openalex::{normalize_work_id, OpenAlexClient};

/// Resolve an identifier to a candidate. The cache is consulted under the
/// canonical key before any network call; fetched candidates are cached.
pub async fn resolve_candidate(
    client: &OpenAlexClient,
    cache: &CandidateCache,
    id: &str,
    query: &str,
) -> Result<Candidate> {
    let (canonical, short) = normalize_work_id(id)?;
    if let Some(hit) = cache.get(&canonical) {
        return Ok(hit);
    }

    let candidate = client.get_work(&short, query).await?;
    cache.insert(candidate.clone());
    Ok(candidate)
}
