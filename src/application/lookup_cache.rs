// Single-entry cache for /api/search/lookup results
//
// Lookups can be expensive on the backend, and the query editor tends to repeat the
// same one while a user types. Only the most recent lookup is kept.
use crate::domain::query::LookupKind;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
struct LookupKey {
    kind: LookupKind,
    query: String,
}

#[derive(Debug, Default)]
struct CacheState {
    key: Option<LookupKey>,
    generation: u64,
    results: Option<Arc<Vec<String>>>,
}

/// Ticket handed out when a lookup starts; only the newest ticket may fill the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupTicket(u64);

#[derive(Debug, Default)]
pub struct LookupCache {
    state: Mutex<CacheState>,
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached results if the most recent lookup had the same kind and query and has completed.
    pub fn get(&self, kind: LookupKind, query: &str) -> Option<Arc<Vec<String>>> {
        let state = self.state.lock();
        match &state.key {
            Some(key) if key.kind == kind && key.query == query => state.results.clone(),
            _ => None,
        }
    }

    /// Record that a lookup for `(kind, query)` is starting. Evicts the previous entry.
    pub fn begin(&self, kind: LookupKind, query: &str) -> LookupTicket {
        let mut state = self.state.lock();
        state.generation += 1;
        state.key = Some(LookupKey {
            kind,
            query: query.to_string(),
        });
        state.results = None;
        LookupTicket(state.generation)
    }

    /// Store results for `ticket`. Returns false when a newer lookup superseded it.
    pub fn complete(&self, ticket: LookupTicket, results: Arc<Vec<String>>) -> bool {
        let mut state = self.state.lock();
        if state.generation != ticket.0 {
            tracing::debug!("Discarding superseded lookup results");
            return false;
        }
        state.results = Some(results);
        true
    }

    /// Drop the entry without starting a cached lookup.
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.key = None;
        state.results = None;
    }
}
