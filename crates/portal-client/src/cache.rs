//! Persisted station id.
//!
//! [`StationCache`] stores the raw identifier under one namespaced key. It
//! never returns an error: storage failures and values that fail the format
//! check both read as a miss, and failed writes report `false`. The store is
//! shared with unrelated code, so every read is re-validated.

use std::sync::Arc;

use portal_types::StationId;

use crate::storage::KeyValueStore;

pub struct StationCache {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl StationCache {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The stored id, if present and format-valid.
    pub fn read(&self) -> Option<StationId> {
        match self.store.get(&self.key) {
            Ok(Some(raw)) => match StationId::parse(raw) {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::debug!(key = %self.key, error = %e, "Ignoring malformed cached station id");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(key = %self.key, error = %e, "Station cache unavailable, treating as miss");
                None
            }
        }
    }

    pub fn write(&self, id: &StationId) -> bool {
        match self.store.set(&self.key, id.as_str()) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to persist station id");
                false
            }
        }
    }

    /// Validate then write. Invalid input never reaches the store.
    pub fn write_raw(&self, raw: &str) -> bool {
        match StationId::parse(raw) {
            Ok(id) => self.write(&id),
            Err(e) => {
                tracing::debug!(error = %e, "Refusing to persist malformed station id");
                false
            }
        }
    }

    /// Best-effort delete.
    pub fn clear(&self) -> bool {
        match self.store.remove(&self.key) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to clear persisted station id");
                false
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
