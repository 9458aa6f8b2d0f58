//! Open WebUI knowledge-store client.
//!
//! Endpoints used:
//!   upload:  POST /api/v1/files/?process=true&process_in_background=true
//!   status:  GET  /api/v1/files/{id}/process/status
//!   search:  GET  /api/v1/knowledge/search?query={name}
//!   create:  POST /api/v1/knowledge/create
//!   attach:  POST /api/v1/knowledge/{id}/files/batch/add

use std::path::Path;
use std::time::Duration;

use reqwest::multipart;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use lectern_common::error::{LecternError, Result};
use lectern_common::http;

use crate::models::KnowledgeBase;
use crate::text::truncate_text;

const BODY_SNIPPET_LEN: usize = 300;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Terminal outcome of waiting for server-side file processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Completed,
    Failed,
    Timeout,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Completed => "completed",
            ProcessStatus::Failed => "failed",
            ProcessStatus::Timeout => "timeout",
        }
    }
}

pub struct KnowledgeStoreClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl KnowledgeStoreClient {
    /// Fails fast when the address or credential is blank. The address is
    /// trimmed of whitespace and trailing slashes.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        let api_key = api_key.trim().to_string();
        if base_url.is_empty() {
            return Err(LecternError::Config(
                "Knowledge store URL is not set (knowledge_store.url or LECTERN_OPENWEBUI_URL)"
                    .to_string(),
            ));
        }
        if api_key.is_empty() {
            return Err(LecternError::Config(
                "Knowledge store API key is not set (knowledge_store.api_key or LECTERN_OPENWEBUI_API_KEY)"
                    .to_string(),
            ));
        }
        Ok(Self { client: http::api_client()?, base_url, api_key })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a non-success response into the diagnostic error shape; the body
    /// snippet is capped so log lines stay readable.
    async fn expect_success(resp: reqwest::Response, endpoint: &str) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(LecternError::KnowledgeApi {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
            body: truncate_text(&body, BODY_SNIPPET_LEN),
        })
    }

    /// List bases matching `name`. No match is an empty list, not an error.
    #[instrument(skip(self))]
    pub async fn search_knowledge_bases(&self, name: &str) -> Result<Vec<KnowledgeBase>> {
        let endpoint = self.endpoint("/api/v1/knowledge/search");
        let resp = self
            .client
            .get(&endpoint)
            .bearer_auth(&self.api_key)
            .query(&[("query", name)])
            .send()
            .await?;

        if resp.status().as_u16() == 404 {
            return Ok(Vec::new());
        }
        let resp = Self::expect_success(resp, &endpoint).await?;
        let bases: Vec<KnowledgeBase> = resp.json().await?;
        Ok(bases)
    }

    /// Reuse an existing base whose name matches case-insensitively after
    /// trimming, else create one. Description and visibility are honoured on
    /// creation only; a reused base is taken as-is. Returns the base and
    /// whether it was created by this call.
    #[instrument(skip(self, description))]
    pub async fn get_or_create_knowledge_base(
        &self,
        name: &str,
        description: &str,
        make_public: bool,
    ) -> Result<(KnowledgeBase, bool)> {
        let wanted = name.trim().to_lowercase();
        let existing = self.search_knowledge_bases(name).await?;
        if let Some(base) = existing
            .into_iter()
            .find(|base| base.name.trim().to_lowercase() == wanted)
        {
            debug!(kb_id = %base.id, "Reusing existing knowledge base");
            return Ok((base, false));
        }

        let endpoint = self.endpoint("/api/v1/knowledge/create");
        let access_control = if make_public { Value::Null } else { json!({}) };
        let resp = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "name": name,
                "description": description,
                "access_control": access_control,
            }))
            .send()
            .await?;
        let resp = Self::expect_success(resp, &endpoint).await?;
        let base: KnowledgeBase = resp.json().await?;
        debug!(kb_id = %base.id, "Created knowledge base");
        Ok((base, true))
    }

    /// Upload a file for background processing; returns the assigned file id.
    /// `metadata` travels as a serialized JSON side-channel part.
    #[instrument(skip(self, metadata), fields(file = %path.display()))]
    pub async fn upload_file(&self, path: &Path, metadata: &Value) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("paper")
            .to_string();

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(content_type_for(path))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("metadata", metadata.to_string());

        let endpoint = self.endpoint("/api/v1/files/");
        let resp = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .query(&[("process", "true"), ("process_in_background", "true")])
            .multipart(form)
            .send()
            .await?;
        let resp = Self::expect_success(resp, &endpoint).await?;
        let body: Value = resp.json().await?;

        body["id"].as_str().map(String::from).ok_or_else(|| {
            LecternError::KnowledgeApi {
                status: 200,
                endpoint,
                body: "upload response carried no file id".to_string(),
            }
        })
    }

    /// A missing status field means the server has not started reporting yet;
    /// treat it as pending and keep polling.
    pub async fn get_file_process_status(&self, file_id: &str) -> Result<String> {
        let endpoint = self.endpoint(&format!("/api/v1/files/{file_id}/process/status"));
        let resp = self
            .client
            .get(&endpoint)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let resp = Self::expect_success(resp, &endpoint).await?;
        let body: Value = resp.json().await?;
        Ok(body["status"].as_str().unwrap_or("pending").to_string())
    }

    /// Poll until processing reaches a terminal state or the timeout elapses.
    /// The timeout is a reported status, not an error.
    #[instrument(skip(self))]
    pub async fn wait_for_file_processed(
        &self,
        file_id: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<ProcessStatus> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.get_file_process_status(file_id).await?.as_str() {
                "completed" => return Ok(ProcessStatus::Completed),
                "failed" => return Ok(ProcessStatus::Failed),
                other => debug!(file_id, status = other, "File still processing"),
            }
            if tokio::time::Instant::now() >= deadline {
                warn!(file_id, "File processing timed out");
                return Ok(ProcessStatus::Timeout);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Attach processed files to a base in one batch call. All-or-nothing at
    /// the transport level; the response body is not consumed.
    #[instrument(skip(self, file_ids), fields(n_files = file_ids.len()))]
    pub async fn add_files_to_knowledge_base(
        &self,
        kb_id: &str,
        file_ids: &[String],
    ) -> Result<()> {
        let endpoint = self.endpoint(&format!("/api/v1/knowledge/{kb_id}/files/batch/add"));
        let payload: Vec<Value> = file_ids.iter().map(|id| json!({ "file_id": id })).collect();
        let resp = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;
        Self::expect_success(resp, &endpoint).await?;
        Ok(())
    }
}

/// Transmitted content type, inferred from the file extension.
fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => "application/pdf",
        _ => "text/markdown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructor_trims_address() {
        let client = KnowledgeStoreClient::new(" http://localhost:8080// ", "sk-key ").unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
        assert_eq!(client.api_key, "sk-key");
    }

    #[test]
    fn test_constructor_rejects_blank_settings() {
        assert!(KnowledgeStoreClient::new("", "sk-key").is_err());
        assert!(KnowledgeStoreClient::new("http://localhost:8080", "   ").is_err());
    }

    #[test]
    fn test_endpoint_join() {
        let client = KnowledgeStoreClient::new("http://localhost:8080/", "k").unwrap();
        assert_eq!(
            client.endpoint("/api/v1/files/"),
            "http://localhost:8080/api/v1/files/"
        );
    }

    #[test]
    fn test_content_type_from_extension() {
        assert_eq!(content_type_for(Path::new("/tmp/a.pdf")), "application/pdf");
        assert_eq!(content_type_for(Path::new("/tmp/a.PDF")), "application/pdf");
        assert_eq!(content_type_for(Path::new("/tmp/a.md")), "text/markdown");
        assert_eq!(content_type_for(Path::new("/tmp/noext")), "text/markdown");
    }

    #[test]
    fn test_process_status_strings() {
        assert_eq!(ProcessStatus::Completed.as_str(), "completed");
        assert_eq!(ProcessStatus::Failed.as_str(), "failed");
        assert_eq!(ProcessStatus::Timeout.as_str(), "timeout");
    }
}
