//! Tool registration for the Lectern tool-call surface.
//!
//! Each tool wraps one pipeline operation and is callable by name with JSON
//! parameters. Tool lifecycle:
//!   1. Implement `LecternTool` for your type.
//!   2. Register with `ToolRegistry::register`.
//!   3. Hosts invoke tools via `ToolRegistry::dispatch(name, params)`.

pub mod ingest_tool;
pub mod screen_tool;
pub mod search_tool;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::context::AppContext;

// ─────────────────────────────────────────────
//  Core trait — implement for each Lectern tool
// ─────────────────────────────────────────────

/// A callable Lectern tool.
///
/// # Minimal contract
/// - `name()` must be unique across the registry (snake_case).
/// - `description()` is surfaced to the tool host as the docstring.
/// - `parameters_schema()` returns a JSON Schema object for the parameters.
/// - `invoke()` receives raw JSON params and must validate them before any
///   I/O; validation failures surface verbatim.
#[async_trait]
pub trait LecternTool: Send + Sync {
    /// Unique tool name (used as the function call identifier).
    fn name(&self) -> &str;

    /// Short description shown to the tool host.
    fn description(&self) -> &str;

    /// JSON Schema describing the expected input parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool. Returns a JSON result or an anyhow error.
    async fn invoke(&self, params: Value) -> Result<Value>;
}

// ─────────────────────────────────────────────
//  Tool registry
// ─────────────────────────────────────────────

/// Central registry mapping tool names → trait objects.
/// Build once at startup, then share via Arc.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn LecternTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    /// Register a tool. Panics if the name is already registered.
    pub fn register<T: LecternTool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        assert!(
            !self.tools.contains_key(&name),
            "Duplicate tool name: {name}"
        );
        self.tools.insert(name, Arc::new(tool));
    }

    /// Invoke a registered tool by name.
    pub async fn invoke(&self, name: &str, params: Value) -> Result<Value> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown tool: {name}"))?;

        tracing::info!(tool = name, "Invoking tool");
        tool.invoke(params).await
    }

    /// Invoke and fold any error into a flagged JSON response so a tool
    /// failure never escapes to the transport as a crash.
    pub async fn dispatch(&self, name: &str, params: Value) -> Value {
        match self.invoke(name, params).await {
            Ok(result) => json!({ "ok": true, "result": result }),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Tool call failed");
                json!({ "ok": false, "error": e.to_string() })
            }
        }
    }

    /// List all registered tools as a JSON function manifest.
    pub fn manifest(&self) -> Value {
        let tools: Vec<Value> = self
            .tools
            .values()
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "parameters": tool.parameters_schema(),
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true if no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get a reference to a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn LecternTool>> {
        self.tools.get(name)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the registry with all three Lectern tools.
pub fn build_default_registry(ctx: Arc<AppContext>) -> ToolRegistry {
    let mut reg = ToolRegistry::new();
    reg.register(search_tool::SearchWorksTool::new(ctx.clone()));
    reg.register(screen_tool::ScreenCandidatesTool::new(ctx.clone()));
    reg.register(ingest_tool::IngestCandidatesTool::new(ctx));
    tracing::info!("ToolRegistry ready with {} tools", reg.len());
    reg
}

// ─────────────────────────────────────────────
//  Parameter validation helpers
// ─────────────────────────────────────────────

/// Integer parameter bounded to [min, max], with a default when absent.
pub(crate) fn integer_in_range(
    params: &Value,
    key: &str,
    min: i64,
    max: i64,
    default: i64,
) -> Result<i64> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => {
            let n = value
                .as_i64()
                .ok_or_else(|| anyhow::anyhow!("'{key}' must be an integer"))?;
            if n < min || n > max {
                anyhow::bail!("'{key}' must be between {min} and {max}");
            }
            Ok(n)
        }
    }
}

/// Like [`integer_in_range`] but without a default; absent stays absent.
pub(crate) fn optional_integer_in_range(
    params: &Value,
    key: &str,
    min: i64,
    max: i64,
) -> Result<Option<i64>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => Ok(Some(integer_in_range(params, key, min, max, min)?)),
    }
}

/// Float parameter bounded to [min, max], with a default when absent.
pub(crate) fn float_in_range(
    params: &Value,
    key: &str,
    min: f64,
    max: f64,
    default: f64,
) -> Result<f64> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => {
            let x = value
                .as_f64()
                .ok_or_else(|| anyhow::anyhow!("'{key}' must be a number"))?;
            if x < min || x > max {
                anyhow::bail!("'{key}' must be between {min} and {max}");
            }
            Ok(x)
        }
    }
}

/// Required array of strings with a bounded item count.
pub(crate) fn string_array(params: &Value, key: &str, min: usize, max: usize) -> Result<Vec<String>> {
    let array = params
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow::anyhow!("'{key}' must be an array of strings"))?;

    let items: Vec<String> = array
        .iter()
        .filter_map(|value| value.as_str().map(String::from))
        .collect();
    if items.len() != array.len() {
        anyhow::bail!("'{key}' must contain only strings");
    }
    if items.len() < min || items.len() > max {
        anyhow::bail!("'{key}' must have between {min} and {max} items");
    }
    Ok(items)
}

// ─────────────────────────────────────────────
//  Tests
// ─────────────────────────────────────────────
