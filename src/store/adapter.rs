//! Typed, time-bounded access to a [`DocumentStore`]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{Collection, DocumentStore, Filter, StoreError, StoreResult};
use crate::core::error::Result;

/// A value persisted as one document of a fixed collection
pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;

    /// Primary key within the collection
    fn key(&self) -> String;
}

/// Entity store adapter shared by every component
///
/// Store failures, decode failures, and elapsed timeouts all surface as
/// `AtlasError::ServiceUnavailable`; nothing is retried here.
#[derive(Clone)]
pub struct StoreAdapter {
    inner: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl StoreAdapter {
    pub fn new(inner: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T, F>(&self, op: &'static str, collection: Collection, call: F) -> Result<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(op, collection = collection.name(), error = %e, "store call failed");
                Err(e.into())
            }
            Err(_) => {
                let millis = self.timeout.as_millis() as u64;
                tracing::warn!(op, collection = collection.name(), timeout_ms = millis, "store call timed out");
                Err(StoreError::Timeout(millis).into())
            }
        }
    }

    fn decode<D: Document>(key: &str, doc: Value) -> Result<D> {
        serde_json::from_value(doc).map_err(|source| {
            StoreError::Decode {
                collection: D::COLLECTION.name(),
                key: key.to_string(),
                source,
            }
            .into()
        })
    }

    fn decode_all<D: Document>(docs: Vec<Value>) -> Result<Vec<D>> {
        docs.into_iter()
            .map(|doc| {
                let key = doc
                    .get("id")
                    .or_else(|| doc.get("name"))
                    .and_then(Value::as_str)
                    .unwrap_or("?")
                    .to_string();
                Self::decode(&key, doc)
            })
            .collect()
    }

    pub async fn get<D: Document>(&self, key: &str) -> Result<Option<D>> {
        let doc = self
            .bounded("get", D::COLLECTION, self.inner.get(D::COLLECTION, key))
            .await?;
        doc.map(|doc| Self::decode(key, doc)).transpose()
    }

    /// Create or replace
    pub async fn put<D: Document>(&self, doc: &D) -> Result<()> {
        let key = doc.key();
        let value = serde_json::to_value(doc)?;
        self.bounded("put", D::COLLECTION, self.inner.put(D::COLLECTION, &key, value))
            .await
    }

    /// Create only; `false` means the key was already taken
    pub async fn insert<D: Document>(&self, doc: &D) -> Result<bool> {
        let key = doc.key();
        let value = serde_json::to_value(doc)?;
        self.bounded("insert", D::COLLECTION, self.inner.insert(D::COLLECTION, &key, value))
            .await
    }

    pub async fn delete<D: Document>(&self, key: &str) -> Result<bool> {
        self.bounded("delete", D::COLLECTION, self.inner.delete(D::COLLECTION, key))
            .await
    }

    pub async fn query<D: Document>(&self, filter: &Filter) -> Result<Vec<D>> {
        let docs = self
            .bounded("query", D::COLLECTION, self.inner.query(D::COLLECTION, filter))
            .await?;
        Self::decode_all(docs)
    }

    pub async fn delete_where<D: Document>(&self, filter: &Filter) -> Result<usize> {
        self.bounded(
            "delete_where",
            D::COLLECTION,
            self.inner.delete_where(D::COLLECTION, filter),
        )
        .await
    }

    pub async fn count<D: Document>(&self, filter: &Filter) -> Result<usize> {
        self.bounded("count", D::COLLECTION, self.inner.count(D::COLLECTION, filter))
            .await
    }
}
