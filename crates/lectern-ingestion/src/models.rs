//! Data models for the acquisition pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::text::truncate_text;

/// Abstract excerpt length in candidate summaries.
const EXCERPT_LEN: usize = 500;

/// A scholarly work discovered on OpenAlex, enriched with a relevance score.
///
/// Bibliographic fields are fixed once fetched; only the relevance fields are
/// rewritten when a screening pass rescores against a new query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Canonical identifier, e.g. `https://openalex.org/W2741809807`.
    pub id: String,
    /// Short form, e.g. `W2741809807`; used for cache keys and filenames.
    pub short_id: String,
    pub title: String,
    /// 0 when the source record carries no year.
    pub publication_year: i32,
    pub publication_date: Option<NaiveDate>,
    pub doi: Option<String>,
    /// Up to six author display names in source order.
    pub authors: Vec<String>,
    pub cited_by_count: u64,
    pub is_oa: bool,
    pub oa_status: String,
    pub pdf_url: Option<String>,
    pub landing_url: Option<String>,
    /// Reconstructed from the inverted index; may be empty.
    pub abstract_text: String,
    pub score: f64,
    pub score_reasons: Vec<String>,
}

impl Candidate {
    pub fn summary(&self) -> CandidateSummary {
        CandidateSummary {
            id: self.id.clone(),
            short_id: self.short_id.clone(),
            title: self.title.clone(),
            publication_year: self.publication_year,
            doi: self.doi.clone(),
            authors: self.authors.clone(),
            cited_by_count: self.cited_by_count,
            is_oa: self.is_oa,
            oa_status: self.oa_status.clone(),
            pdf_url: self.pdf_url.clone(),
            landing_url: self.landing_url.clone(),
            score: self.score,
            score_reasons: self.score_reasons.clone(),
            abstract_excerpt: truncate_text(&self.abstract_text, EXCERPT_LEN),
        }
    }
}

/// Candidate shape returned by the search and screen tools.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateSummary {
    pub id: String,
    pub short_id: String,
    pub title: String,
    pub publication_year: i32,
    pub doi: Option<String>,
    pub authors: Vec<String>,
    pub cited_by_count: u64,
    pub is_oa: bool,
    pub oa_status: String,
    pub pdf_url: Option<String>,
    pub landing_url: Option<String>,
    pub score: f64,
    pub score_reasons: Vec<String>,
    pub abstract_excerpt: String,
}

/// How a candidate's content was materialised on disk, one scratch file each.
#[derive(Debug)]
pub enum RetrievalOutcome {
    /// Full-text PDF downloaded from the open-access URL.
    Pdf { path: PathBuf },
    /// Markdown note synthesised from the abstract; `reason` says why.
    AbstractNote { path: PathBuf, reason: String },
}

impl RetrievalOutcome {
    pub fn mode(&self) -> &'static str {
        match self {
            RetrievalOutcome::Pdf { .. } => "pdf",
            RetrievalOutcome::AbstractNote { .. } => "abstract-only",
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            RetrievalOutcome::Pdf { path } => path,
            RetrievalOutcome::AbstractNote { path, .. } => path,
        }
    }

    pub fn note(&self) -> String {
        match self {
            RetrievalOutcome::Pdf { .. } => "Downloaded OA PDF.".to_string(),
            RetrievalOutcome::AbstractNote { reason, .. } => reason.clone(),
        }
    }
}

/// One row of the ingest report; finalised once, then returned verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionRecord {
    pub id: String,
    pub title: String,
    pub retrieval_mode: String,
    pub note: String,
    /// Remains the last assigned id even when processing fails afterwards.
    pub file_id: Option<String>,
    pub status: String,
    pub error: Option<String>,
}

/// A knowledge base as reported by the server at the moment of query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// `null` means world-readable; any object means restricted.
    #[serde(default)]
    pub access_control: Option<serde_json::Value>,
}

impl KnowledgeBase {
    pub fn is_public(&self) -> bool {
        match &self.access_control {
            None => true,
            Some(v) => v.is_null(),
        }
    }
}

/// Stable response contract of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub knowledge_base_id: String,
    pub knowledge_base_name: String,
    pub created: bool,
    pub requested_public: bool,
    pub actual_public: bool,
    pub warning: Option<String>,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<IngestionRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate() -> Candidate {
        Candidate {
            id: "https://openalex.org/W123".to_string(),
            short_id: "W123".to_string(),
            title: "A Paper".to_string(),
            publication_year: 2024,
            publication_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            doi: Some("https://doi.org/10.1000/test".to_string()),
            authors: vec!["Jane Doe".to_string()],
            cited_by_count: 3,
            is_oa: true,
            oa_status: "gold".to_string(),
            pdf_url: None,
            landing_url: None,
            abstract_text: "x".repeat(600),
            score: 0.5,
            score_reasons: vec![],
        }
    }

    #[test]
    fn test_summary_truncates_abstract() {
        let summary = candidate().summary();
        assert_eq!(summary.abstract_excerpt.chars().count(), 500);
        assert!(summary.abstract_excerpt.ends_with("..."));
    }

    #[test]
    fn test_knowledge_base_null_access_control_is_public() {
        let base: KnowledgeBase =
            serde_json::from_value(json!({ "id": "kb1", "name": "Lib", "access_control": null }))
                .unwrap();
        assert!(base.is_public());

        let missing: KnowledgeBase =
            serde_json::from_value(json!({ "id": "kb2", "name": "Lib" })).unwrap();
        assert!(missing.is_public());
    }

    #[test]
    fn test_knowledge_base_object_access_control_is_restricted() {
        let base: KnowledgeBase =
            serde_json::from_value(json!({ "id": "kb1", "name": "Lib", "access_control": {} }))
                .unwrap();
        assert!(!base.is_public());
    }

    #[test]
    fn test_retrieval_outcome_modes() {
        let pdf = RetrievalOutcome::Pdf { path: PathBuf::from("/tmp/a.pdf") };
        assert_eq!(pdf.mode(), "pdf");
        assert_eq!(pdf.note(), "Downloaded OA PDF.");

        let note = RetrievalOutcome::AbstractNote {
            path: PathBuf::from("/tmp/a.md"),
            reason: "OA PDF unavailable; stored abstract-only note.".to_string(),
        };
        assert_eq!(note.mode(), "abstract-only");
        assert!(note.note().contains("abstract-only"));
    }
}
