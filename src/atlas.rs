//! Engine facade
//!
//! `Atlas` owns the shared context (registry, config, store adapter, entity
//! locks, clock) and hands out borrowed component views. Components hold no
//! state of their own; everything authoritative lives in the store.

use std::sync::Arc;

use crate::analytics::Analytics;
use crate::civilization::Civilizations;
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::AtlasConfig;
use crate::core::error::Result;
use crate::history::History;
use crate::query::Query;
use crate::relations::Relations;
use crate::schema::SchemaRegistry;
use crate::similarity::Similarity;
use crate::store::{DocumentStore, EntityLocks, MemoryStore, StoreAdapter};
use crate::templates::Templates;

/// Shared state every component borrows
pub(crate) struct Context {
    pub registry: Arc<SchemaRegistry>,
    pub config: Arc<AtlasConfig>,
    pub store: StoreAdapter,
    pub locks: EntityLocks,
    pub clock: Arc<dyn Clock>,
}

#[derive(Clone)]
pub struct Atlas {
    ctx: Arc<Context>,
}

impl Atlas {
    /// Validate `config`, build the registry, and bind to `store`
    pub fn new(config: AtlasConfig, store: Arc<dyn DocumentStore>) -> Result<Self> {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Engine over a fresh [`MemoryStore`]
    pub fn in_memory(config: AtlasConfig) -> Result<Self> {
        Self::new(config, Arc::new(MemoryStore::new()))
    }

    pub fn with_clock(
        config: AtlasConfig,
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let registry = SchemaRegistry::with_overrides(&config.attributes)?;
        let adapter = StoreAdapter::new(store, config.store_timeout());

        tracing::info!(
            attributes = registry.definitions().count(),
            total_weight = registry.total_weight(),
            "atlas initialized"
        );

        Ok(Self {
            ctx: Arc::new(Context {
                registry: Arc::new(registry),
                config: Arc::new(config),
                store: adapter,
                locks: EntityLocks::default(),
                clock,
            }),
        })
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.ctx.registry
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.ctx.config
    }

    pub fn civilizations(&self) -> Civilizations<'_> {
        Civilizations::new(&self.ctx)
    }

    pub fn similarity(&self) -> Similarity<'_> {
        Similarity::new(&self.ctx)
    }

    pub fn query(&self) -> Query<'_> {
        Query::new(&self.ctx)
    }

    pub fn analytics(&self) -> Analytics<'_> {
        Analytics::new(&self.ctx)
    }

    pub fn relationships(&self) -> Relations<'_> {
        Relations::new(&self.ctx)
    }

    pub fn history(&self) -> History<'_> {
        History::new(&self.ctx)
    }

    pub fn templates(&self) -> Templates<'_> {
        Templates::new(&self.ctx)
    }
}
