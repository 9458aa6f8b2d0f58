//! Shared state for one agent process: configuration, the OpenAlex client,
//! and the candidate cache. Tools hold this behind an Arc.

use lectern_common::{Config, Result};
use lectern_ingestion::cache::CandidateCache;
use lectern_ingestion::openalex::OpenAlexClient;

pub struct AppContext {
    pub config: Config,
    pub openalex: OpenAlexClient,
    pub cache: CandidateCache,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let openalex = OpenAlexClient::new(
            config.openalex.api_key.clone(),
            config.openalex.mailto.clone(),
        )?;
        Ok(Self {
            config,
            openalex,
            cache: CandidateCache::new(),
        })
    }
}
