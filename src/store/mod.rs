//! Document store abstraction
//!
//! The engine never touches persistence directly. Every component goes
//! through [`adapter::StoreAdapter`], which wraps a [`DocumentStore`] with
//! typed encode/decode and a per-call timeout.
//!
//! Contract for implementors:
//! - a single document's `put`/`insert`/`delete` is atomic
//! - reads never observe a partially written document
//! - `query` returns a point-in-time copy; later writes do not affect it

pub mod adapter;
pub mod locks;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use adapter::{Document, StoreAdapter};
pub use locks::{EntityLocks, PairGuard};
pub use memory::MemoryStore;

/// Logical document collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Civilizations,
    Relationships,
    History,
    /// Highest history sequence issued per civilization
    HistoryCursors,
    Templates,
}

impl Collection {
    pub const ALL: &'static [Collection] = &[
        Collection::Civilizations,
        Collection::Relationships,
        Collection::History,
        Collection::HistoryCursors,
        Collection::Templates,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Civilizations => "civilizations",
            Collection::Relationships => "relationships",
            Collection::History => "history",
            Collection::HistoryCursors => "history_cursors",
            Collection::Templates => "templates",
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store call timed out after {0} ms")]
    Timeout(u64),

    #[error("store backend failure: {0}")]
    Backend(String),

    #[error("undecodable document `{key}` in {collection}: {source}")]
    Decode {
        collection: &'static str,
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Conjunction of equality clauses over dotted document paths
///
/// `Filter::new().eq("attributes.technology_level", "iron_age")` matches
/// documents whose nested `attributes.technology_level` field equals the
/// string. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches every document in a collection
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((path.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses
            .iter()
            .all(|(path, expected)| lookup_path(doc, path) == Some(expected))
    }
}

fn lookup_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |node, segment| node.get(segment))
}

/// Generic get/put/delete/query-by-filter persistence interface
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<Value>>;

    /// Create or replace
    async fn put(&self, collection: Collection, key: &str, doc: Value) -> StoreResult<()>;

    /// Create only; returns `false` without writing if `key` already exists
    async fn insert(&self, collection: Collection, key: &str, doc: Value) -> StoreResult<bool>;

    /// Returns whether a document was removed
    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<bool>;

    async fn query(&self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Value>>;

    /// Remove every matching document, returning how many were removed
    async fn delete_where(&self, collection: Collection, filter: &Filter) -> StoreResult<usize>;

    async fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches_nested_paths() {
        let doc = json!({
            "name": "Aurel",
            "attributes": { "technology_level": "iron_age" }
        });

        assert!(Filter::all().matches(&doc));
        assert!(Filter::new()
            .eq("attributes.technology_level", "iron_age")
            .matches(&doc));
        assert!(!Filter::new()
            .eq("attributes.technology_level", "stone_age")
            .matches(&doc));
        assert!(!Filter::new().eq("attributes.missing", "x").matches(&doc));
    }

    #[test]
    fn test_filter_clauses_are_conjunctive() {
        let doc = json!({ "source": "a", "kind": "trade" });
        let both = Filter::new().eq("source", "a").eq("kind", "trade");
        let mixed = Filter::new().eq("source", "a").eq("kind", "war");
        assert!(both.matches(&doc));
        assert!(!mixed.matches(&doc));
    }
}
