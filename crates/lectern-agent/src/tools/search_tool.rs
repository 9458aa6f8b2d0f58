//! Keyword discovery tool: one OpenAlex search, results ranked by relevance.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use lectern_ingestion::openalex::SearchParams;

use super::{integer_in_range, optional_integer_in_range, LecternTool};
use crate::context::AppContext;

pub struct SearchWorksTool {
    ctx: Arc<AppContext>,
}

impl SearchWorksTool {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl LecternTool for SearchWorksTool {
    fn name(&self) -> &str {
        "search_works"
    }

    fn description(&self) -> &str {
        "Search OpenAlex for scholarly works matching a keyword query. \
         Each hit is scored for lexical relevance against the query and \
         returned ranked, with open-access and PDF availability metadata."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query":     { "type": "string", "minLength": 2, "description": "Keyword query, e.g. graph neural networks" },
                "limit":     { "type": "integer", "default": 20, "minimum": 1, "maximum": 50 },
                "from_year": { "type": "integer", "minimum": 1900, "maximum": 2100, "description": "Only works published in or after this year" },
                "oa_only":   { "type": "boolean", "default": false, "description": "Restrict to open-access works" }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, params: Value) -> Result<Value> {
        let query = params["query"].as_str().unwrap_or("").trim().to_string();
        if query.chars().count() < 2 {
            anyhow::bail!("'query' must be at least 2 characters");
        }
        let limit = integer_in_range(&params, "limit", 1, 50, 20)? as usize;
        let from_year =
            optional_integer_in_range(&params, "from_year", 1900, 2100)?.map(|year| year as i32);
        let oa_only = params["oa_only"].as_bool().unwrap_or(false);

        let outcome = self
            .ctx
            .openalex
            .search_works(&SearchParams { query, limit, from_year, oa_only })
            .await?;

        // Cache every hit so screen/ingest calls can skip the refetch.
        let mut candidates = outcome.candidates;
        for candidate in &candidates {
            self.ctx.cache.insert(candidate.clone());
        }

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let results: Vec<Value> = candidates
            .iter()
            .map(|candidate| serde_json::to_value(candidate.summary()))
            .collect::<std::result::Result<_, _>>()?;

        Ok(json!({
            "total": outcome.total,
            "returned": results.len(),
            "results": results,
        }))
    }
}
