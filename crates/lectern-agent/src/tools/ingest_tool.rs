//! Ingestion tool: acquire selected candidates and attach them to an Open
//! WebUI knowledge base.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use lectern_ingestion::knowledge::KnowledgeStoreClient;
use lectern_ingestion::pipeline::{run_ingest, IngestJob};

use super::{integer_in_range, string_array, LecternTool};
use crate::context::AppContext;

pub struct IngestCandidatesTool {
    ctx: Arc<AppContext>,
}

impl IngestCandidatesTool {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl LecternTool for IngestCandidatesTool {
    fn name(&self) -> &str {
        "ingest_candidates"
    }

    fn description(&self) -> &str {
        "Ingest selected candidate works into an Open WebUI knowledge base. \
         Downloads the open-access PDF where available, otherwise stores an \
         abstract-only note, waits for server-side processing, and attaches \
         everything that completed. Returns a per-candidate report."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "candidate_ids":              { "type": "array", "items": { "type": "string" }, "minItems": 1, "maxItems": 30 },
                "query":                      { "type": "string", "description": "Scoring query for candidates not yet cached" },
                "knowledge_base_name":        { "type": "string" },
                "knowledge_base_description": { "type": "string" },
                "make_public":                { "type": "boolean", "default": true },
                "max_papers":                 { "type": "integer", "default": 10, "minimum": 1, "maximum": 30 },
                "file_process_timeout_sec":   { "type": "integer", "default": 900, "minimum": 30, "maximum": 3600 },
                "openwebui_url":              { "type": "string", "description": "Override the configured knowledge store address" },
                "openwebui_api_key":          { "type": "string", "description": "Override the configured knowledge store credential" }
            },
            "required": ["candidate_ids"]
        })
    }

    async fn invoke(&self, params: Value) -> Result<Value> {
        let candidate_ids = string_array(&params, "candidate_ids", 1, 30)?;
        let query = params["query"].as_str().unwrap_or("").to_string();

        let ingest_cfg = &self.ctx.config.ingest;
        let knowledge_base_name = params["knowledge_base_name"]
            .as_str()
            .unwrap_or(&ingest_cfg.knowledge_base_name)
            .to_string();
        let knowledge_base_description = params["knowledge_base_description"]
            .as_str()
            .unwrap_or(&ingest_cfg.knowledge_base_description)
            .to_string();
        let make_public = params["make_public"].as_bool().unwrap_or(true);
        let max_papers =
            integer_in_range(&params, "max_papers", 1, 30, ingest_cfg.max_papers as i64)? as usize;
        let timeout_sec = integer_in_range(
            &params,
            "file_process_timeout_sec",
            30,
            3600,
            ingest_cfg.file_process_timeout_sec as i64,
        )? as u64;

        // Connection overrides let one call target a different store; the
        // client still fails fast when the merged settings are blank.
        let store_cfg = &self.ctx.config.knowledge_store;
        let url = params["openwebui_url"].as_str().unwrap_or(&store_cfg.url);
        let api_key = params["openwebui_api_key"]
            .as_str()
            .unwrap_or(&store_cfg.api_key);
        let knowledge = KnowledgeStoreClient::new(url, api_key)?;

        let job = IngestJob {
            candidate_ids,
            query,
            knowledge_base_name,
            knowledge_base_description,
            make_public,
            max_papers,
            file_process_timeout: Duration::from_secs(timeout_sec),
        };

        let report = run_ingest(job, &self.ctx.openalex, &knowledge, &self.ctx.cache).await?;
        Ok(serde_json::to_value(report)?)
    }
}
