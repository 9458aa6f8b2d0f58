//! OpenAlex REST API client.
//!
//! Endpoints used:
//!   search: https://api.openalex.org/works?search={query}
//!   get:    https://api.openalex.org/works/{id}
//!
//! Every returned work is normalised into a [`Candidate`] and scored against
//! the query with the lexical relevance heuristic.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use lectern_common::error::{LecternError, Result};
use lectern_common::http;

use crate::models::Candidate;
use crate::text::{rebuild_abstract, relevance};

const WORKS_URL: &str = "https://api.openalex.org/works";
const CANONICAL_PREFIX: &str = "https://openalex.org/";
const MAX_AUTHORS: usize = 6;

/// Field selection requested on every works query; keeps payloads small and
/// the normalised shape stable.
const SELECT_FIELDS: &str = "id,display_name,title,publication_year,publication_date,doi,\
                             cited_by_count,authorships,open_access,primary_location,\
                             abstract_inverted_index";

lazy_static! {
    static ref WORK_ID_RE: Regex = Regex::new(r"(?i)([a-z][0-9]+)").unwrap();
}

/// Extract the work-ID pattern from a raw id, short form, or URL.
/// Returns the canonical and short forms; both derive from each other and
/// both are valid cache keys.
pub fn normalize_work_id(input: &str) -> Result<(String, String)> {
    let caps = WORK_ID_RE
        .captures(input)
        .ok_or_else(|| LecternError::InvalidIdentifier(input.to_string()))?;
    let short = caps[1].to_uppercase();
    Ok((format!("{CANONICAL_PREFIX}{short}"), short))
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    pub limit: usize,
    pub from_year: Option<i32>,
    pub oa_only: bool,
}

#[derive(Debug)]
pub struct SearchOutcome {
    /// Server-reported hit count, falling back to the returned-item count.
    pub total: u64,
    pub candidates: Vec<Candidate>,
}

pub struct OpenAlexClient {
    client: Client,
    api_key: Option<String>,
    mailto: Option<String>,
}

impl OpenAlexClient {
    pub fn new(api_key: Option<String>, mailto: Option<String>) -> Result<Self> {
        Ok(Self { client: http::api_client()?, api_key, mailto })
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        if let Some(mailto) = &self.mailto {
            params.push(("mailto", mailto.clone()));
        }
        params
    }

    /// One search request; no pagination, no retries.
    #[instrument(skip(self, params), fields(query = %params.query))]
    pub async fn search_works(&self, params: &SearchParams) -> Result<SearchOutcome> {
        let mut query_params = self.base_params();
        query_params.push(("search", params.query.clone()));
        query_params.push(("per-page", params.limit.to_string()));
        query_params.push(("select", SELECT_FIELDS.to_string()));

        let mut filters = Vec::new();
        if let Some(year) = params.from_year {
            filters.push(format!("from_publication_date:{year}-01-01"));
        }
        if params.oa_only {
            filters.push("is_oa:true".to_string());
        }
        if !filters.is_empty() {
            query_params.push(("filter", filters.join(",")));
        }

        let resp = self.client.get(WORKS_URL).query(&query_params).send().await?;
        let status = resp.status();
        if !status.is_success() {
            // Report the logical URL; the full one may carry the api key.
            return Err(LecternError::SourceApi {
                status: status.as_u16(),
                url: format!("{WORKS_URL}?search={}", params.query),
            });
        }
        let body: Value = resp.json().await?;

        let results = body["results"].as_array().cloned().unwrap_or_default();
        let total = body["meta"]["count"].as_u64().unwrap_or(results.len() as u64);

        let candidates: Vec<Candidate> = results
            .iter()
            .filter_map(|work| to_candidate(work, &params.query))
            .collect();

        debug!(total, returned = candidates.len(), "OpenAlex search complete");
        Ok(SearchOutcome { total, candidates })
    }

    /// Fetch one work by identifier; normalised and scored like search hits.
    #[instrument(skip(self, query))]
    pub async fn get_work(&self, id: &str, query: &str) -> Result<Candidate> {
        let (_, short) = normalize_work_id(id)?;
        let url = format!("{WORKS_URL}/{short}");

        let resp = self.client.get(&url).query(&self.base_params()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LecternError::SourceApi { status: status.as_u16(), url });
        }
        let work: Value = resp.json().await?;

        to_candidate(&work, query).ok_or_else(|| LecternError::InvalidIdentifier(id.to_string()))
    }
}

/// Normalise a raw OpenAlex work record. Records without a recognisable work
/// id are dropped.
fn to_candidate(work: &Value, query: &str) -> Option<Candidate> {
    let (id, short_id) = normalize_work_id(work["id"].as_str().unwrap_or_default()).ok()?;

    let title = work["display_name"]
        .as_str()
        .or_else(|| work["title"].as_str())
        .unwrap_or("")
        .trim()
        .to_string();

    let authors: Vec<String> = work["authorships"]
        .as_array()
        .unwrap_or(&vec![])
        .iter()
        .filter_map(|a| a["author"]["display_name"].as_str())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .take(MAX_AUTHORS)
        .collect();

    let doi = work["doi"].as_str().map(String::from);

    let pdf_url = work["primary_location"]["pdf_url"]
        .as_str()
        .or_else(|| work["open_access"]["oa_url"].as_str())
        .map(String::from);

    let landing_url = work["primary_location"]["landing_page_url"]
        .as_str()
        .map(String::from)
        .or_else(|| doi.clone());

    let abstract_text = rebuild_abstract(&work["abstract_inverted_index"]);
    let scored = relevance(query, &title, &abstract_text);

    Some(Candidate {
        id,
        short_id,
        title,
        publication_year: work["publication_year"].as_i64().unwrap_or(0) as i32,
        publication_date: work["publication_date"]
            .as_str()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
        doi,
        authors,
        cited_by_count: work["cited_by_count"].as_u64().unwrap_or(0),
        is_oa: work["open_access"]["is_oa"].as_bool().unwrap_or(false),
        oa_status: work["open_access"]["oa_status"]
            .as_str()
            .unwrap_or("unknown")
            .to_string(),
        pdf_url,
        landing_url,
        abstract_text,
        score: scored.score,
        score_reasons: scored.reasons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_work_id_forms() {
        let (canonical, short) = normalize_work_id("w2741809807").unwrap();
        assert_eq!(canonical, "https://openalex.org/W2741809807");
        assert_eq!(short, "W2741809807");

        let (from_url, _) = normalize_work_id("https://openalex.org/W2741809807").unwrap();
        assert_eq!(from_url, canonical);
    }

    #[test]
    fn test_normalize_work_id_idempotent() {
        let (canonical, short) = normalize_work_id("W123").unwrap();
        assert_eq!(normalize_work_id(&canonical).unwrap(), (canonical.clone(), short.clone()));
        assert_eq!(normalize_work_id(&short).unwrap(), (canonical, short));
    }

    #[test]
    fn test_normalize_work_id_rejects_garbage() {
        assert!(normalize_work_id("not-an-id").is_err());
        assert!(normalize_work_id("").is_err());
        assert!(normalize_work_id("12345").is_err());
    }

    #[test]
    fn test_to_candidate_normalisation() {
        let work = json!({
            "id": "https://openalex.org/W1",
            "display_name": "  Deep Learning  ",
            "publication_year": 2015,
            "publication_date": "2015-05-28",
            "doi": "https://doi.org/10.1038/nature14539",
            "cited_by_count": 50000,
            "authorships": [
                { "author": { "display_name": "Yann LeCun" } },
                { "author": { "display_name": "" } },
                { "author": { "display_name": "Yoshua Bengio" } }
            ],
            "open_access": { "is_oa": true, "oa_status": "bronze", "oa_url": "https://example.org/oa.pdf" },
            "primary_location": { "pdf_url": null, "landing_page_url": "https://www.nature.com/articles/nature14539" },
            "abstract_inverted_index": { "Deep": [0], "learning": [1] }
        });

        let candidate = to_candidate(&work, "deep learning").unwrap();
        assert_eq!(candidate.short_id, "W1");
        assert_eq!(candidate.title, "Deep Learning");
        assert_eq!(candidate.authors, vec!["Yann LeCun", "Yoshua Bengio"]);
        // pdf_url falls back to the open-access URL when primary_location has none
        assert_eq!(candidate.pdf_url.as_deref(), Some("https://example.org/oa.pdf"));
        assert_eq!(
            candidate.landing_url.as_deref(),
            Some("https://www.nature.com/articles/nature14539")
        );
        assert_eq!(candidate.abstract_text, "Deep learning");
        assert!(candidate.is_oa);
        assert!(candidate.score > 0.0);
    }

    #[test]
    fn test_to_candidate_defaults_for_missing_fields() {
        let work = json!({ "id": "W2", "title": "Fallback Title" });
        let candidate = to_candidate(&work, "query").unwrap();
        assert_eq!(candidate.title, "Fallback Title");
        assert_eq!(candidate.publication_year, 0);
        assert_eq!(candidate.cited_by_count, 0);
        assert!(!candidate.is_oa);
        assert_eq!(candidate.oa_status, "unknown");
        assert!(candidate.pdf_url.is_none());
        assert!(candidate.landing_url.is_none());
        assert_eq!(candidate.abstract_text, "");
    }

    #[test]
    fn test_to_candidate_caps_authors_at_six() {
        let authorships: Vec<Value> = (0..10)
            .map(|i| json!({ "author": { "display_name": format!("Author {i}") } }))
            .collect();
        let work = json!({ "id": "W3", "display_name": "Many Authors", "authorships": authorships });
        let candidate = to_candidate(&work, "q").unwrap();
        assert_eq!(candidate.authors.len(), 6);
    }

    #[test]
    fn test_to_candidate_drops_unidentifiable_records() {
        assert!(to_candidate(&json!({ "title": "No id" }), "q").is_none());
    }

    #[test]
    fn test_landing_url_falls_back_to_doi() {
        let work = json!({ "id": "W4", "title": "T", "doi": "https://doi.org/10.1/x" });
        let candidate = to_candidate(&work, "q").unwrap();
        assert_eq!(candidate.landing_url.as_deref(), Some("https://doi.org/10.1/x"));
    }
}
