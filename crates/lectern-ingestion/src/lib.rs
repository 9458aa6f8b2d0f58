//! lectern-ingestion — literature acquisition core.
//!
//! Given a keyword query, discover candidate works on OpenAlex, score their
//! lexical relevance, and ingest a selected subset into an Open WebUI
//! knowledge base: full-text open-access PDFs when reachable, abstract-only
//! markdown notes otherwise.

pub mod cache;
pub mod knowledge;
pub mod models;
pub mod openalex;
pub mod pipeline;
pub mod resolve;
pub mod screen;
pub mod text;
