//! lectern-common — Shared error type, configuration, and HTTP plumbing used across Lectern crates.

pub mod config;
pub mod error;
pub mod http;

// Re-export commonly used types
pub use config::Config;
pub use error::{LecternError, Result};
