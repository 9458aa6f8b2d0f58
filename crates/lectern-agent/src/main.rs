//! Lectern — literature acquisition agent.
//! Entry point: line-delimited JSON tool calls on stdin, one JSON response
//! per line on stdout. Logs go to stderr so stdout stays machine-readable.

mod context;
mod tools;

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lectern_common::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lectern=debug,info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Lectern starting up");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    let ctx = Arc::new(context::AppContext::new(config)?);
    let registry = tools::build_default_registry(ctx);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(line) {
            Ok(request) => {
                let name = request["tool"].as_str().unwrap_or("").to_string();
                let params = request.get("params").cloned().unwrap_or(Value::Null);
                registry.dispatch(&name, params).await
            }
            Err(e) => serde_json::json!({ "ok": false, "error": format!("invalid request: {e}") }),
        };

        stdout.write_all(response.to_string().as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    Ok(())
}
