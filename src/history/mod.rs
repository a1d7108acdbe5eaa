//! Per-civilization event timelines
//!
//! Appends for one civilization are serialized on its entity lock. Under
//! that lock the manager evicts events past the retention horizon, applies
//! the overflow policy, and stamps the new event with
//! `max(now, last timestamp)` and the next sequence number. Timelines are
//! therefore ordered by `(timestamp, sequence)` even when the clock stalls
//! or steps backwards.
//!
//! The highest issued sequence is kept in a per-civilization cursor
//! document, so numbering keeps increasing after events are purged or
//! deleted.

use serde::{Deserialize, Serialize};

use crate::atlas::Context;
use crate::civilization::Civilizations;
use crate::core::config::HistoryOverflow;
use crate::core::error::{AtlasError, Result};
use crate::core::types::{CivilizationId, EventId, Page, Timestamp};
use crate::query::Pagination;
use crate::schema::Attribute;
use crate::store::{Collection, Document, Filter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactLevel {
    Minor,
    Moderate,
    Major,
    Transformative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEvent {
    pub id: EventId,
    pub civilization_id: CivilizationId,
    /// Per-civilization insertion counter, starting at 1 and never reused
    pub sequence: u64,
    pub timestamp: Timestamp,
    pub event_type: String,
    pub description: String,
    pub title: Option<String>,
    /// In-world year, negative for before the epoch
    pub year: Option<i64>,
    pub era: Option<String>,
    pub impact: Option<ImpactLevel>,
    pub affected_attributes: Vec<Attribute>,
}

impl Document for HistoryEvent {
    const COLLECTION: Collection = Collection::History;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Highest sequence ever issued for one civilization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SequenceCursor {
    pub civilization_id: CivilizationId,
    pub last_sequence: u64,
}

impl Document for SequenceCursor {
    const COLLECTION: Collection = Collection::HistoryCursors;

    fn key(&self) -> String {
        self.civilization_id.to_string()
    }
}

/// Caller-supplied part of an event; timestamp and sequence are assigned
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewHistoryEvent {
    pub event_type: String,
    pub description: String,
    pub title: Option<String>,
    pub year: Option<i64>,
    pub era: Option<String>,
    pub impact: Option<ImpactLevel>,
    /// Attribute names
    pub affected_attributes: Vec<String>,
}

impl NewHistoryEvent {
    pub fn new(event_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn year(mut self, year: i64) -> Self {
        self.year = Some(year);
        self
    }

    pub fn era(mut self, era: impl Into<String>) -> Self {
        self.era = Some(era.into());
        self
    }

    pub fn impact(mut self, impact: ImpactLevel) -> Self {
        self.impact = Some(impact);
        self
    }

    pub fn affects(mut self, attribute: impl Into<String>) -> Self {
        self.affected_attributes.push(attribute.into());
        self
    }
}

/// History timeline manager
pub struct History<'a> {
    ctx: &'a Context,
}

impl<'a> History<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    pub async fn add_event(
        &self,
        civilization: CivilizationId,
        event_type: &str,
        description: &str,
    ) -> Result<HistoryEvent> {
        self.record(civilization, NewHistoryEvent::new(event_type, description))
            .await
    }

    pub async fn record(&self, civilization: CivilizationId, input: NewHistoryEvent) -> Result<HistoryEvent> {
        let event_type = input.event_type.trim();
        if event_type.is_empty() {
            return Err(AtlasError::validation("event_type", "must not be empty"));
        }
        let max_description = self.ctx.config.max_description_length;
        if input.description.chars().count() > max_description {
            return Err(AtlasError::validation(
                "description",
                format!("longer than {} characters", max_description),
            ));
        }
        let mut affected = Vec::with_capacity(input.affected_attributes.len());
        for name in &input.affected_attributes {
            let attribute = Attribute::from_name(name).ok_or_else(|| {
                AtlasError::validation("affected_attributes", format!("unknown attribute `{}`", name))
            })?;
            if !affected.contains(&attribute) {
                affected.push(attribute);
            }
        }

        let _guard = self.ctx.locks.lock(&civilization).await;
        Civilizations::new(self.ctx).ensure_exists(civilization).await?;

        let now = self.ctx.clock.now();
        let mut events = self.load(civilization).await?;
        let stored = events.iter().map(|e| e.sequence).max().unwrap_or(0);
        let issued = self
            .ctx
            .store
            .get::<SequenceCursor>(&civilization.to_string())
            .await?
            .map_or(stored, |cursor| cursor.last_sequence.max(stored));
        let next_sequence = issued + 1;
        let last_timestamp = events.last().map(|e| e.timestamp);

        self.evict_expired(&mut events, now).await?;

        let limit = self.ctx.config.max_history_events_per_entity;
        if events.len() >= limit {
            match self.ctx.config.history_overflow {
                HistoryOverflow::Reject => {
                    tracing::warn!(civilization = %civilization, limit, "history limit reached");
                    return Err(AtlasError::LimitExceeded {
                        what: "history events",
                        entity: civilization.to_string(),
                        limit,
                    });
                }
                HistoryOverflow::EvictOldest => {
                    let excess = events.len() + 1 - limit;
                    for oldest in events.drain(..excess) {
                        self.ctx.store.delete::<HistoryEvent>(&oldest.key()).await?;
                    }
                    tracing::debug!(civilization = %civilization, evicted = excess, "evicted oldest history events");
                }
            }
        }

        let event = HistoryEvent {
            id: EventId::new(),
            civilization_id: civilization,
            sequence: next_sequence,
            timestamp: last_timestamp.map_or(now, |last| now.max(last)),
            event_type: event_type.to_string(),
            description: input.description,
            title: input.title,
            year: input.year,
            era: input.era,
            impact: input.impact,
            affected_attributes: affected,
        };
        if !self.ctx.store.insert(&event).await? {
            return Err(AtlasError::conflict("history event", event.id));
        }
        self.ctx
            .store
            .put(&SequenceCursor {
                civilization_id: civilization,
                last_sequence: next_sequence,
            })
            .await?;
        Ok(event)
    }

    /// Events for `civilization`, oldest first
    pub async fn get_history(&self, civilization: CivilizationId) -> Result<Vec<HistoryEvent>> {
        Civilizations::new(self.ctx).ensure_exists(civilization).await?;
        self.load(civilization).await
    }

    /// One page of the timeline, oldest first
    pub async fn get_history_page(
        &self,
        civilization: CivilizationId,
        page: usize,
        page_size: Option<usize>,
    ) -> Result<Page<HistoryEvent>> {
        let pagination = Pagination::resolve(&self.ctx.config, page, page_size)?;
        let events = self.get_history(civilization).await?;
        Ok(pagination.apply(events, usize::MAX))
    }

    /// Drop events past the retention horizon; returns how many were removed
    pub async fn purge_expired(&self, civilization: CivilizationId) -> Result<usize> {
        let _guard = self.ctx.locks.lock(&civilization).await;
        Civilizations::new(self.ctx).ensure_exists(civilization).await?;

        let mut events = self.load(civilization).await?;
        self.evict_expired(&mut events, self.ctx.clock.now()).await
    }

    pub async fn delete_event(&self, id: EventId) -> Result<()> {
        if !self.ctx.store.delete::<HistoryEvent>(&id.to_string()).await? {
            return Err(AtlasError::not_found("history event", id));
        }
        Ok(())
    }

    async fn load(&self, civilization: CivilizationId) -> Result<Vec<HistoryEvent>> {
        let mut events = self
            .ctx
            .store
            .query::<HistoryEvent>(&Filter::new().eq("civilization_id", civilization.to_string()))
            .await?;
        events.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.sequence.cmp(&b.sequence))
        });
        Ok(events)
    }

    /// Remove events older than the retention horizon from the store and from `events`
    async fn evict_expired(&self, events: &mut Vec<HistoryEvent>, now: Timestamp) -> Result<usize> {
        // A horizon before the calendar's start expires nothing
        let expired = match now.checked_sub_signed(self.ctx.config.history_retention()) {
            Some(horizon) => events.iter().take_while(|e| e.timestamp < horizon).count(),
            None => 0,
        };
        for event in events.drain(..expired) {
            self.ctx.store.delete::<HistoryEvent>(&event.key()).await?;
        }
        if expired > 0 {
            tracing::debug!(evicted = expired, "evicted history past retention");
        }
        Ok(expired)
    }
}
