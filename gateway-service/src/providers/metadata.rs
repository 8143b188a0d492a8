//! Key/value JSON metadata owned by the identity backend.
//!
//! Keys are either user ids or synthetic keys such as `policy:{tenant}:{role}`.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};

use crate::services::ServiceError;

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// The object stored under `key`; empty when nothing was stored.
    async fn get(&self, key: &str) -> Result<Map<String, Value>, ServiceError>;

    /// Shallow-merge `update` into the stored object. A `null` value removes the key.
    async fn merge(
        &self,
        key: &str,
        update: Map<String, Value>,
    ) -> Result<Map<String, Value>, ServiceError>;
}

/// Top-level merge shared by every store implementation.
pub fn merge_shallow(current: &mut Map<String, Value>, update: Map<String, Value>) {
    for (key, value) in update {
        if value.is_null() {
            current.remove(&key);
        } else {
            current.insert(key, value);
        }
    }
}

/// Single-process store for development wiring and tests.
#[derive(Default)]
pub struct InMemoryMetadataStore {
    entries: DashMap<String, Map<String, Value>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn get(&self, key: &str) -> Result<Map<String, Value>, ServiceError> {
        Ok(self
            .entries
            .get(key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }

    async fn merge(
        &self,
        key: &str,
        update: Map<String, Value>,
    ) -> Result<Map<String, Value>, ServiceError> {
        let mut entry = self.entries.entry(key.to_string()).or_default();
        merge_shallow(entry.value_mut(), update);
        Ok(entry.value().clone())
    }
}
