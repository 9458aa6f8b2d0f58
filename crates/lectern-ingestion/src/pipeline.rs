//! End-to-end ingestion pipeline.
//!
//! For each selected candidate:
//!   1. Resolve via the cache or a single OpenAlex fetch
//!   2. Pick the retrieval tier: OA PDF download, falling back to an
//!      abstract-only markdown note when the PDF is unavailable or invalid
//!   3. Upload the scratch file, poll server-side processing to a terminal
//!      state, and fold the outcome into the candidate's record
//!   4. Remove the scratch file
//! then resolve the target knowledge base once and attach every file that
//! reached `completed` in a single batch call.
//!
//! Candidates are processed strictly sequentially. One candidate's failure
//! never fails the run; only configuration problems and knowledge-base
//! resolution abort the whole call.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, instrument, warn};

use lectern_common::error::{LecternError, Result};
use lectern_common::http;

use crate::cache::CandidateCache;
use crate::knowledge::{KnowledgeStoreClient, ProcessStatus, DEFAULT_POLL_INTERVAL};
use crate::models::{Candidate, IngestReport, IngestionRecord, RetrievalOutcome};
use crate::openalex::OpenAlexClient;
use crate::resolve::resolve_candidate;
use crate::text::{sanitize_filename, MAX_FILENAME_LEN};

/// Hard ceiling on a downloaded PDF, declared or measured.
const MAX_PDF_BYTES: u64 = 80 * 1024 * 1024;

// ── Job config ────────────────────────────────────────────────────────────────

/// Parameters for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestJob {
    pub candidate_ids: Vec<String>,
    /// Used to score candidates fetched during resolution; may be empty.
    pub query: String,
    pub knowledge_base_name: String,
    pub knowledge_base_description: String,
    pub make_public: bool,
    pub max_papers: usize,
    pub file_process_timeout: Duration,
}

// ── Pipeline orchestrator ─────────────────────────────────────────────────────

/// Run the pipeline for one job.
#[instrument(skip_all, fields(n_requested = job.candidate_ids.len(), kb = %job.knowledge_base_name))]
pub async fn run_ingest(
    job: IngestJob,
    openalex: &OpenAlexClient,
    knowledge: &KnowledgeStoreClient,
    cache: &CandidateCache,
) -> Result<IngestReport> {
    let selected = select_candidates(&job.candidate_ids, job.max_papers);
    info!(selected = selected.len(), "Starting ingestion run");

    let scratch_dir = std::env::temp_dir();
    let mut results: Vec<IngestionRecord> = Vec::new();
    let mut completed_files: Vec<String> = Vec::new();

    for id in &selected {
        let record = ingest_candidate(id, &job, openalex, knowledge, cache, &scratch_dir).await;
        if record.status == ProcessStatus::Completed.as_str() {
            if let Some(file_id) = &record.file_id {
                completed_files.push(file_id.clone());
            }
        }
        results.push(record);
    }

    // The knowledge base is resolved once per run, never per candidate.
    let (base, created) = knowledge
        .get_or_create_knowledge_base(
            &job.knowledge_base_name,
            &job.knowledge_base_description,
            job.make_public,
        )
        .await?;

    if !completed_files.is_empty() {
        knowledge
            .add_files_to_knowledge_base(&base.id, &completed_files)
            .await?;
    }

    let actual_public = base.is_public();
    let warning = if job.make_public && !actual_public {
        Some(format!(
            "Requested a public knowledge base but '{}' has restricted access on the server",
            base.name
        ))
    } else {
        None
    };

    let succeeded = completed_files.len();
    let failed = results.len() - succeeded;
    info!(succeeded, failed, kb_id = %base.id, created, "Ingestion run complete");

    Ok(IngestReport {
        knowledge_base_id: base.id,
        knowledge_base_name: base.name,
        created,
        requested_public: job.make_public,
        actual_public,
        warning,
        succeeded,
        failed,
        results,
    })
}

/// Dedupe preserving first occurrence, then cap at `max_papers`. IDs over the
/// cap are dropped without appearing in the report.
fn select_candidates(ids: &[String], max_papers: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    for id in ids {
        if selected.len() >= max_papers {
            break;
        }
        if seen.insert(id.clone()) {
            selected.push(id.clone());
        }
    }
    selected
}

/// Process one candidate end to end. Every failure is folded into the
/// returned record; this function never errors.
async fn ingest_candidate(
    id: &str,
    job: &IngestJob,
    openalex: &OpenAlexClient,
    knowledge: &KnowledgeStoreClient,
    cache: &CandidateCache,
    scratch_dir: &Path,
) -> IngestionRecord {
    let candidate = match resolve_candidate(openalex, cache, id, &job.query).await {
        Ok(candidate) => candidate,
        Err(e) => {
            warn!(id, error = %e, "Candidate resolution failed");
            return IngestionRecord {
                id: id.to_string(),
                title: String::new(),
                retrieval_mode: "none".to_string(),
                note: "Candidate could not be resolved; nothing ingested.".to_string(),
                file_id: None,
                status: "failed".to_string(),
                error: Some(e.to_string()),
            };
        }
    };

    let outcome = match acquire_content(&candidate, scratch_dir).await {
        Ok(outcome) => outcome,
        Err(e) => {
            // Only local I/O on the note file can land here.
            return IngestionRecord {
                id: candidate.id.clone(),
                title: candidate.title.clone(),
                retrieval_mode: "abstract-only".to_string(),
                note: "Failed to write abstract-only note.".to_string(),
                file_id: None,
                status: "failed".to_string(),
                error: Some(e.to_string()),
            };
        }
    };

    let metadata = json!({
        "source": "openalex",
        "openalex_id": candidate.short_id,
        "doi": candidate.doi,
        "title": candidate.title,
        "retrieval_mode": outcome.mode(),
    });

    let mut file_id: Option<String> = None;
    let mut status = "failed".to_string();
    let mut error: Option<String> = None;

    match knowledge.upload_file(outcome.path(), &metadata).await {
        Ok(assigned) => {
            file_id = Some(assigned.clone());
            match knowledge
                .wait_for_file_processed(&assigned, job.file_process_timeout, DEFAULT_POLL_INTERVAL)
                .await
            {
                Ok(ProcessStatus::Completed) => status = ProcessStatus::Completed.as_str().to_string(),
                Ok(ProcessStatus::Failed) => {
                    status = ProcessStatus::Failed.as_str().to_string();
                    error = Some("Server-side file processing failed".to_string());
                }
                Ok(ProcessStatus::Timeout) => {
                    status = ProcessStatus::Timeout.as_str().to_string();
                    error = Some(format!(
                        "File processing did not finish within {}s",
                        job.file_process_timeout.as_secs()
                    ));
                }
                Err(e) => error = Some(e.to_string()),
            }
        }
        Err(e) => error = Some(e.to_string()),
    }

    // Scratch files never outlive the candidate; removal failures are ignored.
    let _ = tokio::fs::remove_file(outcome.path()).await;

    debug!(id = %candidate.short_id, status = %status, "Candidate finished");

    IngestionRecord {
        id: candidate.id.clone(),
        title: candidate.title.clone(),
        retrieval_mode: outcome.mode().to_string(),
        note: outcome.note(),
        file_id,
        status,
        error,
    }
}

// ── Retrieval tiers ───────────────────────────────────────────────────────────

/// Retrieval-tier selection. Tier one downloads the OA PDF; a missing
/// precondition or a failed download falls back to an abstract-only note.
async fn acquire_content(candidate: &Candidate, scratch_dir: &Path) -> Result<RetrievalOutcome> {
    let stem = format!(
        "{}_{}",
        sanitize_filename(&candidate.title, MAX_FILENAME_LEN),
        candidate.short_id
    );

    if candidate.is_oa {
        if let Some(url) = &candidate.pdf_url {
            let path = scratch_dir.join(format!("{stem}.pdf"));
            match download_pdf(url, &path).await {
                Ok(()) => return Ok(RetrievalOutcome::Pdf { path }),
                Err(e) => {
                    debug!(id = %candidate.short_id, error = %e, "PDF download failed, falling back");
                    let reason = format!("PDF download failed: {e}; stored abstract-only note.");
                    let path = write_note(candidate, &reason, scratch_dir, &stem).await?;
                    return Ok(RetrievalOutcome::AbstractNote { path, reason });
                }
            }
        }
    }

    let reason = "OA PDF unavailable; stored abstract-only note.".to_string();
    let path = write_note(candidate, &reason, scratch_dir, &stem).await?;
    Ok(RetrievalOutcome::AbstractNote { path, reason })
}

/// Download `url` to `path`, validating size and that the payload is a PDF
/// (content-type header or the `%PDF` leading bytes).
async fn download_pdf(url: &str, path: &Path) -> Result<()> {
    let client = http::download_client()?;
    let resp = client.get(url).send().await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(LecternError::Download(format!(
            "HTTP {} fetching {url}",
            status.as_u16()
        )));
    }
    if let Some(declared) = resp.content_length() {
        if declared > MAX_PDF_BYTES {
            return Err(LecternError::Download(format!(
                "declared size {declared} bytes exceeds the {MAX_PDF_BYTES} byte limit"
            )));
        }
    }
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    let bytes = resp.bytes().await?;
    if bytes.len() as u64 > MAX_PDF_BYTES {
        return Err(LecternError::Download(format!(
            "downloaded {} bytes, over the {MAX_PDF_BYTES} byte limit",
            bytes.len()
        )));
    }
    if !content_type.contains("application/pdf") && !bytes.starts_with(b"%PDF") {
        return Err(LecternError::Download(format!(
            "response is not a PDF (content-type: {content_type})"
        )));
    }

    tokio::fs::write(path, &bytes).await?;
    Ok(())
}

/// Render the abstract-only markdown note to a scratch file.
async fn write_note(
    candidate: &Candidate,
    reason: &str,
    scratch_dir: &Path,
    stem: &str,
) -> Result<PathBuf> {
    let path = scratch_dir.join(format!("{stem}.md"));
    tokio::fs::write(&path, render_note(candidate, reason)).await?;
    Ok(path)
}

/// Fixed note layout: H1 title, metadata bullets, then the abstract.
fn render_note(candidate: &Candidate, reason: &str) -> String {
    let mut note = format!("# {}\n\n", candidate.title);
    note.push_str(&format!("- OpenAlex ID: {}\n", candidate.short_id));
    if let Some(doi) = &candidate.doi {
        note.push_str(&format!("- DOI: {doi}\n"));
    }
    if candidate.publication_year > 0 {
        note.push_str(&format!("- Year: {}\n", candidate.publication_year));
    }
    note.push_str(&format!(
        "- Open access: {} ({})\n",
        if candidate.is_oa { "yes" } else { "no" },
        candidate.oa_status
    ));
    note.push_str("- Retrieval mode: abstract-only\n");
    note.push_str(&format!("- Note: {reason}\n"));
    note.push_str("\n## Abstract\n\n");
    if candidate.abstract_text.is_empty() {
        note.push_str("No abstract available.\n");
    } else {
        note.push_str(&candidate.abstract_text);
        note.push('\n');
    }
    note
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(short_id: &str) -> Candidate {
        Candidate {
            id: format!("https://openalex.org/{short_id}"),
            short_id: short_id.to_string(),
            title: "Attention Is All You Need".to_string(),
            publication_year: 2017,
            publication_date: None,
            doi: Some("https://doi.org/10.48550/arXiv.1706.03762".to_string()),
            authors: vec!["Ashish Vaswani".to_string()],
            cited_by_count: 100_000,
            is_oa: true,
            oa_status: "green".to_string(),
            pdf_url: None,
            landing_url: None,
            abstract_text: "The dominant sequence transduction models.".to_string(),
            score: 0.9,
            score_reasons: vec![],
        }
    }

    #[test]
    fn test_select_candidates_dedupes_preserving_order() {
        let ids: Vec<String> = ["W1", "W2", "W1", "W3"].iter().map(|s| s.to_string()).collect();
        assert_eq!(select_candidates(&ids, 10), vec!["W1", "W2", "W3"]);
    }

    #[test]
    fn test_select_candidates_caps_silently() {
        let ids: Vec<String> = ["W1", "W2", "W3"].iter().map(|s| s.to_string()).collect();
        let selected = select_candidates(&ids, 1);
        assert_eq!(selected, vec!["W1"]);
    }

    #[test]
    fn test_select_candidates_dedupes_before_capping() {
        let ids: Vec<String> = ["W1", "W1", "W2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(select_candidates(&ids, 2), vec!["W1", "W2"]);
    }

    #[test]
    fn test_render_note_full_metadata() {
        let note = render_note(&candidate("W100"), "OA PDF unavailable; stored abstract-only note.");
        assert!(note.starts_with("# Attention Is All You Need\n\n"));
        assert!(note.contains("- OpenAlex ID: W100\n"));
        assert!(note.contains("- DOI: https://doi.org/10.48550/arXiv.1706.03762\n"));
        assert!(note.contains("- Year: 2017\n"));
        assert!(note.contains("- Open access: yes (green)\n"));
        assert!(note.contains("- Retrieval mode: abstract-only\n"));
        assert!(note.contains("- Note: OA PDF unavailable; stored abstract-only note.\n"));
        assert!(note.contains("\n## Abstract\n\nThe dominant sequence transduction models.\n"));
    }

    #[test]
    fn test_render_note_omits_missing_fields() {
        let mut sparse = candidate("W101");
        sparse.doi = None;
        sparse.publication_year = 0;
        sparse.is_oa = false;
        sparse.oa_status = "unknown".to_string();
        sparse.abstract_text = String::new();

        let note = render_note(&sparse, "reason");
        assert!(!note.contains("- DOI:"));
        assert!(!note.contains("- Year:"));
        assert!(note.contains("- Open access: no (unknown)\n"));
        assert!(note.contains("No abstract available.\n"));
    }

    #[tokio::test]
    async fn test_acquire_content_falls_back_without_pdf_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut no_pdf = candidate("W102");
        no_pdf.pdf_url = None;

        let outcome = acquire_content(&no_pdf, dir.path()).await.unwrap();
        assert_eq!(outcome.mode(), "abstract-only");
        assert_eq!(
            outcome.note(),
            "OA PDF unavailable; stored abstract-only note."
        );
        let written = std::fs::read_to_string(outcome.path()).unwrap();
        assert!(written.contains("## Abstract"));
        assert!(outcome
            .path()
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .ends_with("_W102.md"));
    }

    #[tokio::test]
    async fn test_acquire_content_ignores_pdf_url_when_not_oa() {
        let dir = tempfile::tempdir().unwrap();
        let mut paywalled = candidate("W103");
        paywalled.is_oa = false;
        paywalled.pdf_url = Some("https://example.org/paywalled.pdf".to_string());

        let outcome = acquire_content(&paywalled, dir.path()).await.unwrap();
        assert_eq!(outcome.mode(), "abstract-only");
    }
}
