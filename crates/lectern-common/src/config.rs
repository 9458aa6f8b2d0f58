//! Configuration loading for Lectern.
//! Reads lectern.toml from the current directory or the path in the
//! LECTERN_CONFIG env var; credentials may instead come from LECTERN_*
//! environment variables, which take precedence over the file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{LecternError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub knowledge_store: KnowledgeStoreConfig,
    #[serde(default)]
    pub openalex: OpenAlexConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Open WebUI connection settings. Both fields are required before any
/// ingestion can run; the client constructor rejects blank values.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KnowledgeStoreConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
}

/// OpenAlex works fine anonymously; key and mailto are attached to requests
/// only when present.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenAlexConfig {
    pub api_key: Option<String>,
    /// Contact address for the OpenAlex polite pool.
    pub mailto: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_kb_name")]
    pub knowledge_base_name: String,
    #[serde(default = "default_kb_description")]
    pub knowledge_base_description: String,
    #[serde(default = "default_max_papers")]
    pub max_papers: usize,
    #[serde(default = "default_process_timeout")]
    pub file_process_timeout_sec: u64,
}

fn default_kb_name()         -> String { "Research Library".to_string() }
fn default_kb_description()  -> String { "Scholarly works ingested from OpenAlex".to_string() }
fn default_max_papers()      -> usize  { 10 }
fn default_process_timeout() -> u64    { 900 }

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            knowledge_base_name: default_kb_name(),
            knowledge_base_description: default_kb_description(),
            max_papers: default_max_papers(),
            file_process_timeout_sec: default_process_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from lectern.toml, then apply env overrides.
    /// A missing file is fine as long as the env vars cover the credentials.
    pub fn load() -> Result<Self> {
        let path = std::env::var("LECTERN_CONFIG").unwrap_or_else(|_| "lectern.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path)?;
            tracing::debug!(path = %path, "Loaded configuration file");
            toml::from_str(&content).map_err(|e| LecternError::Config(format!("{path}: {e}")))?
        } else {
            tracing::debug!(path = %path, "No configuration file, relying on environment");
            Config::default()
        };

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("LECTERN_OPENWEBUI_URL") {
            self.knowledge_store.url = url;
        }
        if let Ok(key) = std::env::var("LECTERN_OPENWEBUI_API_KEY") {
            self.knowledge_store.api_key = key;
        }
        if let Ok(key) = std::env::var("LECTERN_OPENALEX_API_KEY") {
            self.openalex.api_key = Some(key);
        }
        if let Ok(mailto) = std::env::var("LECTERN_OPENALEX_MAILTO") {
            self.openalex.mailto = Some(mailto);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_defaults() {
        let config = Config::default();
        assert_eq!(config.ingest.max_papers, 10);
        assert_eq!(config.ingest.file_process_timeout_sec, 900);
        assert_eq!(config.ingest.knowledge_base_name, "Research Library");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [knowledge_store]
            url = "http://localhost:8080"
            api_key = "sk-test"

            [ingest]
            max_papers = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.knowledge_store.url, "http://localhost:8080");
        assert_eq!(config.ingest.max_papers, 5);
        assert_eq!(config.ingest.file_process_timeout_sec, 900);
        assert!(config.openalex.mailto.is_none());
    }
}
