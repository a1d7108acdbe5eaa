//! Atlas configuration with documented defaults
//!
//! Every limit the engine enforces is collected here. Values are loaded from
//! TOML, optionally overridden from `CIV_ATLAS_*` environment variables, and
//! validated once at startup. Nothing here is mutated by request traffic.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{AtlasError, Result};
use crate::schema::AttributeOrdering;

/// Upper bound for `history_retention_days`, roughly ten thousand years
pub const MAX_HISTORY_RETENTION_DAYS: u32 = 3_650_000;

/// What happens when an entity already holds the maximum number of history events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOverflow {
    /// Refuse the new event with `LimitExceeded`
    Reject,
    /// Drop the oldest retained event to make room
    EvictOldest,
}

/// How a dimension missing on either side of a comparison is scored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingAttributePolicy {
    /// The dimension counts with similarity 0 (maximal distance)
    MaxDistance,
    /// The dimension is left out of both numerator and denominator
    Skip,
}

/// Per-attribute registry override, keyed by attribute name in `AtlasConfig::attributes`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeOverride {
    pub weight: Option<f64>,
    pub ordering: Option<AttributeOrdering>,
    /// Explicit rank per value; must cover every legal value when present
    pub ranks: Option<BTreeMap<String, u32>>,
}

/// Configuration consumed by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    // === RELATIONSHIPS ===
    /// Maximum outgoing relationships a single civilization may own
    pub max_relationships_per_entity: usize,

    // === HISTORY ===
    /// Maximum retained history events per civilization
    pub max_history_events_per_entity: usize,

    /// Events older than this many days are evicted on the next append
    /// (at most [`MAX_HISTORY_RETENTION_DAYS`])
    pub history_retention_days: u32,

    /// Behavior once `max_history_events_per_entity` is reached
    pub history_overflow: HistoryOverflow,

    // === QUERY ===
    /// Page size used when the caller does not supply one
    pub default_page_size: usize,

    /// Requested page sizes are clamped to this
    pub max_page_size: usize,

    /// Only the first `search_limit` matches are reachable through pagination
    pub search_limit: usize,

    // === SIMILARITY ===
    /// Default minimum score for `find_similar`
    pub similarity_threshold: f64,

    /// Scoring of dimensions absent on either side
    pub missing_attribute: MissingAttributePolicy,

    /// Population size at which ranking switches to parallel scoring
    ///
    /// Below this, thread overhead exceeds the benefit.
    pub parallel_threshold: usize,

    // === STORE ===
    /// Upper bound on any single store call before it is reported unavailable
    pub store_timeout_ms: u64,

    // === RECORD VALIDATION ===
    pub max_name_length: usize,
    pub max_description_length: usize,
    pub max_tags: usize,

    // === SCHEMA ===
    /// Weight and ordering overrides applied when the registry is built
    pub attributes: BTreeMap<String, AttributeOverride>,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            max_relationships_per_entity: 1000,

            max_history_events_per_entity: 1000,
            history_retention_days: 3650,
            history_overflow: HistoryOverflow::Reject,

            default_page_size: 100,
            max_page_size: 1000,
            search_limit: 1000,

            similarity_threshold: 0.5,
            missing_attribute: MissingAttributePolicy::MaxDistance,
            parallel_threshold: 1000,

            store_timeout_ms: 5000,

            max_name_length: 200,
            max_description_length: 5000,
            max_tags: 50,

            attributes: BTreeMap::new(),
        }
    }
}

impl AtlasConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AtlasConfig =
            toml::from_str(content).map_err(|e| AtlasError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| AtlasError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CIV_ATLAS_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, raw: String) -> Result<T> {
            raw.trim()
                .parse()
                .map_err(|_| AtlasError::Config(format!("{} has an invalid value: {}", key, raw)))
        }

        if let Some(raw) = lookup("CIV_ATLAS_MAX_RELATIONSHIPS") {
            self.max_relationships_per_entity = parse("CIV_ATLAS_MAX_RELATIONSHIPS", raw)?;
        }
        if let Some(raw) = lookup("CIV_ATLAS_MAX_HISTORY_EVENTS") {
            self.max_history_events_per_entity = parse("CIV_ATLAS_MAX_HISTORY_EVENTS", raw)?;
        }
        if let Some(raw) = lookup("CIV_ATLAS_HISTORY_RETENTION_DAYS") {
            self.history_retention_days = parse("CIV_ATLAS_HISTORY_RETENTION_DAYS", raw)?;
        }
        if let Some(raw) = lookup("CIV_ATLAS_DEFAULT_PAGE_SIZE") {
            self.default_page_size = parse("CIV_ATLAS_DEFAULT_PAGE_SIZE", raw)?;
        }
        if let Some(raw) = lookup("CIV_ATLAS_MAX_PAGE_SIZE") {
            self.max_page_size = parse("CIV_ATLAS_MAX_PAGE_SIZE", raw)?;
        }
        if let Some(raw) = lookup("CIV_ATLAS_SEARCH_LIMIT") {
            self.search_limit = parse("CIV_ATLAS_SEARCH_LIMIT", raw)?;
        }
        if let Some(raw) = lookup("CIV_ATLAS_SIMILARITY_THRESHOLD") {
            self.similarity_threshold = parse("CIV_ATLAS_SIMILARITY_THRESHOLD", raw)?;
        }
        Ok(())
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_relationships_per_entity == 0 {
            return Err(AtlasError::Config(
                "max_relationships_per_entity must be at least 1".into(),
            ));
        }
        if self.max_history_events_per_entity == 0 {
            return Err(AtlasError::Config(
                "max_history_events_per_entity must be at least 1".into(),
            ));
        }
        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err(AtlasError::Config("page sizes must be positive".into()));
        }
        if self.default_page_size > self.max_page_size {
            return Err(AtlasError::Config(format!(
                "default_page_size ({}) should be <= max_page_size ({})",
                self.default_page_size, self.max_page_size
            )));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(AtlasError::Config(format!(
                "similarity_threshold ({}) must lie in [0, 1]",
                self.similarity_threshold
            )));
        }
        if self.history_retention_days > MAX_HISTORY_RETENTION_DAYS {
            return Err(AtlasError::Config(format!(
                "history_retention_days ({}) must be <= {}",
                self.history_retention_days, MAX_HISTORY_RETENTION_DAYS
            )));
        }
        if self.store_timeout_ms == 0 {
            return Err(AtlasError::Config("store_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn history_retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.history_retention_days))
    }
}
