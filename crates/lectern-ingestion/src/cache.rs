//! Process-wide candidate cache.
//!
//! Keyed by both the canonical and short identifier forms so either resolves
//! to the same candidate. Written after every fetch or rescore, never
//! evicted; the process is short-lived per invocation. Owned by the
//! orchestration context and passed by reference, not ambient state.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::Candidate;

#[derive(Debug, Default)]
pub struct CandidateCache {
    inner: Mutex<HashMap<String, Candidate>>,
}

impl CandidateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up by canonical or short identifier.
    pub fn get(&self, key: &str) -> Option<Candidate> {
        self.inner.lock().unwrap().get(key).cloned()
    }

    /// Insert under both identifier forms. Last writer wins, which is fine:
    /// rescoring is idempotent for fixed inputs.
    pub fn insert(&self, candidate: Candidate) {
        let mut inner = self.inner.lock().unwrap();
        inner.insert(candidate.id.clone(), candidate.clone());
        inner.insert(candidate.short_id.clone(), candidate);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
