use thiserror::Error;

#[derive(Debug, Error)]
pub enum LecternError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAlex error: HTTP {status} for {url}")]
    SourceApi { status: u16, url: String },

    #[error("Knowledge store error: HTTP {status} at {endpoint}: {body}")]
    KnowledgeApi {
        status: u16,
        endpoint: String,
        body: String,
    },

    #[error("Invalid work identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("{0}")]
    Download(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LecternError>;
