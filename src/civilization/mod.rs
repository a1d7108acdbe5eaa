//! Civilization records and their lifecycle
//!
//! Records are created from a [`CivilizationDraft`], replaced wholesale on
//! update, and deleted together with every relationship and history event
//! that references them.

use serde::{Deserialize, Serialize};

use crate::atlas::Context;
use crate::core::error::{AtlasError, Result};
use crate::core::types::{CivilizationId, Page, Timestamp};
use crate::history::{HistoryEvent, SequenceCursor};
use crate::query::Pagination;
use crate::relations::Relationship;
use crate::schema::{Attribute, AttributeSet, AttributeValue, RawAttributes};
use crate::store::{Document, Filter};

/// Upper bound on a plausible life expectancy, in years
pub const MAX_LIFE_EXPECTANCY: f64 = 200.0;

/// Optional exact figures backing the categorical population/lifespan buckets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Measurements {
    pub exact_population: Option<u64>,
    /// Years, within `0..=200`
    pub exact_life_expectancy: Option<f64>,
    pub territory_size_km2: Option<f64>,
}

impl Measurements {
    fn validate(&self) -> Result<()> {
        if let Some(years) = self.exact_life_expectancy {
            if !years.is_finite() || !(0.0..=MAX_LIFE_EXPECTANCY).contains(&years) {
                return Err(AtlasError::validation(
                    "exact_life_expectancy",
                    format!("must lie within 0..={}", MAX_LIFE_EXPECTANCY),
                ));
            }
        }
        if let Some(area) = self.territory_size_km2 {
            if !area.is_finite() || area < 0.0 {
                return Err(AtlasError::validation(
                    "territory_size_km2",
                    "must be a non-negative number",
                ));
            }
        }
        Ok(())
    }
}

/// Caller-supplied content for a create or full-replace update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CivilizationDraft {
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub created_by: Option<String>,
    /// Attribute name -> value; must cover every catalog attribute
    pub attributes: RawAttributes,
    pub measurements: Measurements,
}

impl CivilizationDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Draft carrying an already-validated attribute set
    pub fn from_attributes(name: impl Into<String>, attributes: &AttributeSet) -> Self {
        Self {
            name: name.into(),
            attributes: attributes.to_raw(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_creator(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = Some(created_by.into());
        self
    }
}

/// A stored civilization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CivilizationRecord {
    pub id: CivilizationId,
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub created_by: Option<String>,
    /// Always complete: one legal value per catalog attribute
    pub attributes: AttributeSet,
    pub measurements: Measurements,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CivilizationRecord {
    pub fn attribute(&self, attribute: Attribute) -> Option<AttributeValue> {
        self.attributes.get(attribute)
    }

    /// Raw value of the attribute called `name`
    pub fn value_of(&self, name: &str) -> Option<&'static str> {
        Attribute::from_name(name)
            .and_then(|attribute| self.attributes.get(attribute))
            .map(AttributeValue::as_str)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

impl Document for CivilizationRecord {
    const COLLECTION: crate::store::Collection = crate::store::Collection::Civilizations;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// What a cascading delete removed besides the record itself
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletionSummary {
    pub relationships_removed: usize,
    pub events_removed: usize,
}

/// Draft content after validation
struct ValidDraft {
    name: String,
    description: Option<String>,
    tags: Vec<String>,
    created_by: Option<String>,
    attributes: AttributeSet,
    measurements: Measurements,
}

/// Record lifecycle operations
pub struct Civilizations<'a> {
    ctx: &'a Context,
}

impl<'a> Civilizations<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    fn validate(&self, draft: &CivilizationDraft) -> Result<ValidDraft> {
        let config = &self.ctx.config;

        let name = draft.name.trim();
        if name.is_empty() {
            return Err(AtlasError::validation("name", "must not be empty"));
        }
        if name.chars().count() > config.max_name_length {
            return Err(AtlasError::validation(
                "name",
                format!("longer than {} characters", config.max_name_length),
            ));
        }

        let description = draft
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        if let Some(description) = description {
            if description.chars().count() > config.max_description_length {
                return Err(AtlasError::validation(
                    "description",
                    format!("longer than {} characters", config.max_description_length),
                ));
            }
        }

        if draft.tags.len() > config.max_tags {
            return Err(AtlasError::validation(
                "tags",
                format!("at most {} tags are allowed", config.max_tags),
            ));
        }
        let mut tags: Vec<String> = Vec::with_capacity(draft.tags.len());
        for tag in &draft.tags {
            let tag = tag.trim();
            if tag.is_empty() {
                return Err(AtlasError::validation("tags", "tags must not be empty"));
            }
            if !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }

        draft.measurements.validate()?;
        let attributes = self.ctx.registry.parse_attributes(&draft.attributes, true)?;

        Ok(ValidDraft {
            name: name.to_string(),
            description: description.map(str::to_string),
            tags,
            created_by: draft.created_by.clone(),
            attributes,
            measurements: draft.measurements.clone(),
        })
    }

    pub async fn create(&self, draft: &CivilizationDraft) -> Result<CivilizationRecord> {
        let valid = self.validate(draft)?;
        let now = self.ctx.clock.now();
        let record = CivilizationRecord {
            id: CivilizationId::new(),
            name: valid.name,
            description: valid.description,
            tags: valid.tags,
            created_by: valid.created_by,
            attributes: valid.attributes,
            measurements: valid.measurements,
            created_at: now,
            updated_at: now,
        };

        if !self.ctx.store.insert(&record).await? {
            return Err(AtlasError::conflict("civilization", record.id));
        }
        tracing::info!(id = %record.id, name = %record.name, "civilization created");
        Ok(record)
    }

    pub async fn get(&self, id: CivilizationId) -> Result<CivilizationRecord> {
        self.ctx
            .store
            .get::<CivilizationRecord>(&id.to_string())
            .await?
            .ok_or_else(|| AtlasError::not_found("civilization", id))
    }

    pub(crate) async fn ensure_exists(&self, id: CivilizationId) -> Result<()> {
        self.get(id).await.map(|_| ())
    }

    /// Replace every field except `id` and `created_at`
    pub async fn update(&self, id: CivilizationId, draft: &CivilizationDraft) -> Result<CivilizationRecord> {
        let valid = self.validate(draft)?;
        let _guard = self.ctx.locks.lock(&id).await;

        let existing = self.get(id).await?;
        let record = CivilizationRecord {
            id,
            name: valid.name,
            description: valid.description,
            tags: valid.tags,
            created_by: valid.created_by,
            attributes: valid.attributes,
            measurements: valid.measurements,
            created_at: existing.created_at,
            updated_at: self.ctx.clock.now().max(existing.updated_at),
        };
        self.ctx.store.put(&record).await?;
        tracing::debug!(id = %id, "civilization updated");
        Ok(record)
    }

    /// Remove the record, its relationships in either direction, and its history
    pub async fn delete(&self, id: CivilizationId) -> Result<DeletionSummary> {
        let _guard = self.ctx.locks.lock(&id).await;

        if !self.ctx.store.delete::<CivilizationRecord>(&id.to_string()).await? {
            return Err(AtlasError::not_found("civilization", id));
        }

        let key = id.to_string();
        let outgoing = self
            .ctx
            .store
            .delete_where::<Relationship>(&Filter::new().eq("source", key.clone()))
            .await?;
        let incoming = self
            .ctx
            .store
            .delete_where::<Relationship>(&Filter::new().eq("target", key.clone()))
            .await?;
        let events = self
            .ctx
            .store
            .delete_where::<HistoryEvent>(&Filter::new().eq("civilization_id", key.clone()))
            .await?;
        self.ctx.store.delete::<SequenceCursor>(&key).await?;

        let summary = DeletionSummary {
            relationships_removed: outgoing + incoming,
            events_removed: events,
        };
        tracing::info!(
            id = %id,
            relationships = summary.relationships_removed,
            events = summary.events_removed,
            "civilization deleted"
        );
        Ok(summary)
    }

    /// All records, most recently updated first
    pub async fn list(&self, page: usize, page_size: Option<usize>) -> Result<Page<CivilizationRecord>> {
        let pagination = Pagination::resolve(&self.ctx.config, page, page_size)?;
        let mut records = self.all().await?;
        sort_recent_first(&mut records);
        Ok(pagination.apply(records, usize::MAX))
    }

    /// Snapshot of the whole population
    pub(crate) async fn all(&self) -> Result<Vec<CivilizationRecord>> {
        self.ctx.store.query(&Filter::all()).await
    }
}

/// `updated_at` descending, then id ascending
pub(crate) fn sort_recent_first(records: &mut [CivilizationRecord]) {
    records.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
