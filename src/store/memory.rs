//! In-process document store
//!
//! One `RwLock` guards every collection, so each write is atomic and every
//! query clones a consistent snapshot.

use std::collections::BTreeMap;

use ahash::AHashMap;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Collection, DocumentStore, Filter, StoreResult};

type Documents = BTreeMap<String, Value>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<AHashMap<Collection, Documents>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents across all collections
    pub async fn len(&self) -> usize {
        self.collections.read().await.values().map(BTreeMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.get(key))
            .cloned())
    }

    async fn put(&self, collection: Collection, key: &str, doc: Value) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection)
            .or_default()
            .insert(key.to_string(), doc);
        Ok(())
    }

    async fn insert(&self, collection: Collection, key: &str, doc: Value) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        if docs.contains_key(key) {
            return Ok(false);
        }
        docs.insert(key.to_string(), doc);
        Ok(true)
    }

    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(&collection)
            .map(|docs| docs.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn query(&self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Value>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| {
                docs.values()
                    .filter(|doc| filter.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_where(&self, collection: Collection, filter: &Filter) -> StoreResult<usize> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|_, doc| !filter.matches(doc));
        Ok(before - docs.len())
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<usize> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|docs| docs.values().filter(|doc| filter.matches(doc)).count())
            .unwrap_or(0))
    }
}
