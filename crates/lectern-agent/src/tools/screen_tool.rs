//! Screening tool: rescore known candidates and split them at a threshold.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use lectern_ingestion::screen::run_screen;

use super::{float_in_range, string_array, LecternTool};
use crate::context::AppContext;

pub struct ScreenCandidatesTool {
    ctx: Arc<AppContext>,
}

impl ScreenCandidatesTool {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl LecternTool for ScreenCandidatesTool {
    fn name(&self) -> &str {
        "screen_candidates"
    }

    fn description(&self) -> &str {
        "Rescore candidate works against a query and partition them into \
         relevant and irrelevant sets at an inclusive score threshold. \
         Candidates not seen by a prior search are fetched from OpenAlex."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query":         { "type": "string", "description": "Query to rescore against" },
                "candidate_ids": { "type": "array", "items": { "type": "string" }, "minItems": 1, "maxItems": 100 },
                "threshold":     { "type": "number", "default": 0.35, "minimum": 0, "maximum": 1 }
            },
            "required": ["query", "candidate_ids"]
        })
    }

    async fn invoke(&self, params: Value) -> Result<Value> {
        let query = params["query"].as_str().unwrap_or("").trim().to_string();
        if query.is_empty() {
            anyhow::bail!("'query' must be a non-empty string");
        }
        let candidate_ids = string_array(&params, "candidate_ids", 1, 100)?;
        let threshold = float_in_range(&params, "threshold", 0.0, 1.0, 0.35)?;

        let report = run_screen(
            &self.ctx.openalex,
            &self.ctx.cache,
            &query,
            &candidate_ids,
            threshold,
        )
        .await?;

        Ok(serde_json::to_value(report)?)
    }
}
