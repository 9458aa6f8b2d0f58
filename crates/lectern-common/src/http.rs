//! Shared HTTP client construction.
//! All outbound traffic uses clients built here so timeout and user-agent
//! policy stays in one place.

use reqwest::{redirect, Client, ClientBuilder};
use std::time::Duration;

use crate::error::{LecternError, Result};

pub const USER_AGENT: &str = concat!("lectern/", env!("CARGO_PKG_VERSION"));

const API_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for JSON API traffic (OpenAlex, knowledge store).
pub fn api_client() -> Result<Client> {
    ClientBuilder::new()
        .timeout(API_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| LecternError::Config(format!("Failed to build HTTP client: {e}")))
}

/// Client for PDF downloads: longer timeout, follows publisher redirect chains.
pub fn download_client() -> Result<Client> {
    ClientBuilder::new()
        .timeout(DOWNLOAD_TIMEOUT)
        .redirect(redirect::Policy::limited(10))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| LecternError::Config(format!("Failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clients_build() {
        assert!(api_client().is_ok());
        assert!(download_client().is_ok());
    }

    #[test]
    fn test_user_agent_carries_version() {
        assert!(USER_AGENT.starts_with("lectern/"));
    }
}
