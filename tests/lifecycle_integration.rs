//! Integration tests for record lifecycle, cascades, and store failures

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use civ_atlas::core::config::AtlasConfig;
use civ_atlas::store::{Collection, DocumentStore, Filter, MemoryStore, StoreError, StoreResult};
use civ_atlas::{seed, Atlas, AtlasError};

#[tokio::test]
async fn test_delete_cascades_to_relationships_and_history() {
    let atlas = Atlas::in_memory(AtlasConfig::default()).unwrap();
    let mut ids = Vec::new();
    for draft in seed::generate_drafts(404, 3) {
        ids.push(atlas.civilizations().create(&draft).await.unwrap().id);
    }
    let (doomed, ally, rival) = (ids[0], ids[1], ids[2]);

    atlas.relationships().create_relationship(doomed, ally, "ally", 0.8).await.unwrap();
    atlas.relationships().create_relationship(rival, doomed, "rival", 0.4).await.unwrap();
    atlas.relationships().create_relationship(ally, rival, "trade", 0.5).await.unwrap();
    atlas.history().add_event(doomed, "founding", "first stones").await.unwrap();
    atlas.history().add_event(doomed, "collapse", "last stones").await.unwrap();
    atlas.history().add_event(ally, "founding", "elsewhere").await.unwrap();

    let summary = atlas.civilizations().delete(doomed).await.unwrap();
    assert_eq!(summary.relationships_removed, 2);
    assert_eq!(summary.events_removed, 2);

    assert!(matches!(
        atlas.civilizations().get(doomed).await,
        Err(AtlasError::NotFound { .. })
    ));
    // Unrelated edges and timelines survive
    assert_eq!(atlas.relationships().get_relationships(ally).await.unwrap().len(), 1);
    assert_eq!(atlas.relationships().get_relationships(rival).await.unwrap().len(), 1);
    assert_eq!(atlas.history().get_history(ally).await.unwrap().len(), 1);
    assert_eq!(atlas.analytics().statistics().await.unwrap().total_count, 2);
}

#[tokio::test]
async fn test_config_overrides_reach_the_registry() {
    let config = AtlasConfig::from_toml_str(
        r#"
        [attributes.primary_religion]
        weight = 4.0

        [attributes.art_focus]
        weight = 0.0
        "#,
    )
    .unwrap();
    let atlas = Atlas::in_memory(config).unwrap();
    let registry = atlas.registry();
    assert_eq!(registry.weight(civ_atlas::schema::Attribute::PrimaryReligion), 4.0);
    assert_eq!(registry.total_weight(), 38.0 + 3.0 - 1.0);
}

#[test]
fn test_bad_override_fails_startup() {
    let config = AtlasConfig::from_toml_str("[attributes.hair_color]\nweight = 1.0").unwrap();
    assert!(matches!(Atlas::in_memory(config), Err(AtlasError::Config(_))));
}

/// Wraps a memory store and stalls every call longer than the atlas timeout
struct StalledStore {
    inner: MemoryStore,
    stall: Duration,
}

impl StalledStore {
    async fn pause(&self) {
        tokio::time::sleep(self.stall).await;
    }
}

#[async_trait]
impl DocumentStore for StalledStore {
    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<Value>> {
        self.pause().await;
        self.inner.get(collection, key).await
    }
    async fn put(&self, collection: Collection, key: &str, doc: Value) -> StoreResult<()> {
        self.pause().await;
        self.inner.put(collection, key, doc).await
    }
    async fn insert(&self, collection: Collection, key: &str, doc: Value) -> StoreResult<bool> {
        self.pause().await;
        self.inner.insert(collection, key, doc).await
    }
    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<bool> {
        self.pause().await;
        self.inner.delete(collection, key).await
    }
    async fn query(&self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Value>> {
        self.pause().await;
        self.inner.query(collection, filter).await
    }
    async fn delete_where(&self, collection: Collection, filter: &Filter) -> StoreResult<usize> {
        self.pause().await;
        self.inner.delete_where(collection, filter).await
    }
    async fn count(&self, _: Collection, _: &Filter) -> StoreResult<usize> {
        Err(StoreError::Backend("index offline".into()))
    }
}

#[tokio::test]
async fn test_backend_failures_surface_as_service_unavailable() {
    let atlas = Atlas::new(
        AtlasConfig::default(),
        Arc::new(StalledStore {
            inner: MemoryStore::new(),
            stall: Duration::ZERO,
        }),
    )
    .unwrap();
    let mut ids = Vec::new();
    for draft in seed::generate_drafts(2, 2) {
        ids.push(atlas.civilizations().create(&draft).await.unwrap().id);
    }

    // The per-source count is served by the failing call
    let err = atlas
        .relationships()
        .create_relationship(ids[0], ids[1], "ally", 0.5)
        .await
        .unwrap_err();
    assert!(matches!(err, AtlasError::ServiceUnavailable(ref reason) if reason.contains("index offline")));
}

#[tokio::test]
async fn test_store_timeouts_surface_as_service_unavailable() {
    let config = AtlasConfig {
        store_timeout_ms: 20,
        ..AtlasConfig::default()
    };
    let store = StalledStore {
        inner: MemoryStore::new(),
        stall: Duration::from_millis(500),
    };
    let atlas = Atlas::new(config, Arc::new(store)).unwrap();

    let err = atlas.analytics().statistics().await.unwrap_err();
    assert!(matches!(err, AtlasError::ServiceUnavailable(_)));

    let draft = seed::generate_drafts(1, 1).remove(0);
    let err = atlas.civilizations().create(&draft).await.unwrap_err();
    assert!(matches!(err, AtlasError::ServiceUnavailable(_)));
}

/// Slows civilization lookups while armed, leaving every other call untouched
struct SlowLookupStore {
    inner: MemoryStore,
    armed: AtomicBool,
    delay: Duration,
}

#[async_trait]
impl DocumentStore for SlowLookupStore {
    async fn get(&self, collection: Collection, key: &str) -> StoreResult<Option<Value>> {
        if collection == Collection::Civilizations && self.armed.load(Ordering::SeqCst) {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.get(collection, key).await
    }
    async fn put(&self, collection: Collection, key: &str, doc: Value) -> StoreResult<()> {
        self.inner.put(collection, key, doc).await
    }
    async fn insert(&self, collection: Collection, key: &str, doc: Value) -> StoreResult<bool> {
        self.inner.insert(collection, key, doc).await
    }
    async fn delete(&self, collection: Collection, key: &str) -> StoreResult<bool> {
        self.inner.delete(collection, key).await
    }
    async fn query(&self, collection: Collection, filter: &Filter) -> StoreResult<Vec<Value>> {
        self.inner.query(collection, filter).await
    }
    async fn delete_where(&self, collection: Collection, filter: &Filter) -> StoreResult<usize> {
        self.inner.delete_where(collection, filter).await
    }
    async fn count(&self, collection: Collection, filter: &Filter) -> StoreResult<usize> {
        self.inner.count(collection, filter).await
    }
}

/// Start a relationship create, delete one endpoint while its lookups are
/// in flight, and check that no edge outlives the deleted record
async fn create_racing_delete(delete_source: bool) {
    let store = Arc::new(SlowLookupStore {
        inner: MemoryStore::new(),
        armed: AtomicBool::new(false),
        delay: Duration::from_millis(200),
    });
    let atlas = Atlas::new(AtlasConfig::default(), store.clone()).unwrap();
    let mut ids = Vec::new();
    for draft in seed::generate_drafts(515, 2) {
        ids.push(atlas.civilizations().create(&draft).await.unwrap().id);
    }
    let (source, target) = (ids[0], ids[1]);
    let (doomed, survivor) = if delete_source { (source, target) } else { (target, source) };

    store.armed.store(true, Ordering::SeqCst);
    let creator = {
        let atlas = atlas.clone();
        tokio::spawn(async move {
            atlas
                .relationships()
                .create_relationship(source, target, "ally", 0.5)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let summary = atlas.civilizations().delete(doomed).await.unwrap();
    let created = creator.await.unwrap();
    store.armed.store(false, Ordering::SeqCst);

    match created {
        Ok(_) => assert_eq!(summary.relationships_removed, 1),
        Err(err) => {
            assert!(matches!(err, AtlasError::NotFound { .. }));
            assert_eq!(summary.relationships_removed, 0);
        }
    }
    assert!(atlas.relationships().get_relationships(survivor).await.unwrap().is_empty());
    let doomed_key = doomed.to_string();
    for field in ["source", "target"] {
        let dangling = store
            .query(Collection::Relationships, &Filter::new().eq(field, doomed_key.clone()))
            .await
            .unwrap();
        assert!(dangling.is_empty(), "edge left with deleted {}", field);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_relationship_create_racing_source_delete_leaves_no_edge() {
    create_racing_delete(true).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_relationship_create_racing_target_delete_leaves_no_edge() {
    create_racing_delete(false).await;
}
