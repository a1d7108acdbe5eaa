//! Directed, weighted edges between civilizations
//!
//! The per-source cap is checked and the edge written while holding the
//! source's entity lock, so concurrent creators cannot overshoot it.

use serde::{Deserialize, Serialize};

use crate::atlas::Context;
use crate::civilization::Civilizations;
use crate::core::error::{AtlasError, Result};
use crate::core::types::{CivilizationId, RelationshipId, Timestamp};
use crate::store::{Collection, Document, Filter};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub source: CivilizationId,
    pub target: CivilizationId,
    /// Free-form tag such as `trade_partner` or `rival`
    pub kind: String,
    /// In [0, 1]
    pub strength: f64,
    pub description: Option<String>,
    pub created_at: Timestamp,
}

impl Document for Relationship {
    const COLLECTION: Collection = Collection::Relationships;

    fn key(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// The queried entity is the source
    Outgoing,
    /// The queried entity is the target
    Incoming,
}

/// An edge as seen from one endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipView {
    pub direction: Direction,
    #[serde(flatten)]
    pub relationship: Relationship,
}

impl RelationshipView {
    /// The endpoint that is not the queried entity
    pub fn counterpart(&self) -> CivilizationId {
        match self.direction {
            Direction::Outgoing => self.relationship.target,
            Direction::Incoming => self.relationship.source,
        }
    }
}

/// Input for `Relations::create`
#[derive(Debug, Clone, PartialEq)]
pub struct NewRelationship {
    pub source: CivilizationId,
    pub target: CivilizationId,
    pub kind: String,
    pub strength: f64,
    pub description: Option<String>,
}

impl NewRelationship {
    pub fn new(source: CivilizationId, target: CivilizationId, kind: impl Into<String>, strength: f64) -> Self {
        Self {
            source,
            target,
            kind: kind.into(),
            strength,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Relationship graph manager
pub struct Relations<'a> {
    ctx: &'a Context,
}

impl<'a> Relations<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    fn civilizations(&self) -> Civilizations<'a> {
        Civilizations::new(self.ctx)
    }

    pub async fn create_relationship(
        &self,
        source: CivilizationId,
        target: CivilizationId,
        kind: &str,
        strength: f64,
    ) -> Result<Relationship> {
        self.create(NewRelationship::new(source, target, kind, strength))
            .await
    }

    pub async fn create(&self, input: NewRelationship) -> Result<Relationship> {
        if input.source == input.target {
            return Err(AtlasError::invalid_argument(
                "target",
                "a civilization cannot relate to itself",
            ));
        }
        if !input.strength.is_finite() || !(0.0..=1.0).contains(&input.strength) {
            return Err(AtlasError::invalid_argument(
                "strength",
                format!("{} is outside [0, 1]", input.strength),
            ));
        }
        let kind = input.kind.trim();
        if kind.is_empty() {
            return Err(AtlasError::invalid_argument("kind", "must not be empty"));
        }
        let description = input
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        if let Some(description) = &description {
            if description.chars().count() > self.ctx.config.max_description_length {
                return Err(AtlasError::validation(
                    "description",
                    format!("longer than {} characters", self.ctx.config.max_description_length),
                ));
            }
        }

        // Held until the edge is written; deleting either endpoint takes the same stripe
        let _guard = self.ctx.locks.lock_pair(&input.source, &input.target).await;
        self.civilizations().ensure_exists(input.source).await?;
        self.civilizations().ensure_exists(input.target).await?;

        let limit = self.ctx.config.max_relationships_per_entity;
        let current = self
            .ctx
            .store
            .count::<Relationship>(&outgoing_filter(input.source))
            .await?;
        if current >= limit {
            tracing::warn!(source = %input.source, limit, "relationship limit reached");
            return Err(AtlasError::LimitExceeded {
                what: "relationships",
                entity: input.source.to_string(),
                limit,
            });
        }

        let relationship = Relationship {
            id: RelationshipId::new(),
            source: input.source,
            target: input.target,
            kind: kind.to_string(),
            strength: input.strength,
            description,
            created_at: self.ctx.clock.now(),
        };
        if !self.ctx.store.insert(&relationship).await? {
            return Err(AtlasError::conflict("relationship", relationship.id));
        }
        tracing::debug!(
            id = %relationship.id,
            source = %relationship.source,
            target = %relationship.target,
            kind = relationship.kind.as_str(),
            "relationship created"
        );
        Ok(relationship)
    }

    /// Every edge touching `id`, oldest first
    pub async fn get_relationships(&self, id: CivilizationId) -> Result<Vec<RelationshipView>> {
        self.civilizations().ensure_exists(id).await?;

        let outgoing = self
            .ctx
            .store
            .query::<Relationship>(&outgoing_filter(id))
            .await?;
        let incoming = self
            .ctx
            .store
            .query::<Relationship>(&Filter::new().eq("target", id.to_string()))
            .await?;

        let mut views: Vec<RelationshipView> = outgoing
            .into_iter()
            .map(|relationship| RelationshipView {
                direction: Direction::Outgoing,
                relationship,
            })
            .chain(incoming.into_iter().map(|relationship| RelationshipView {
                direction: Direction::Incoming,
                relationship,
            }))
            .collect();
        views.sort_by(|a, b| {
            a.relationship
                .created_at
                .cmp(&b.relationship.created_at)
                .then_with(|| a.relationship.id.cmp(&b.relationship.id))
        });
        Ok(views)
    }

    pub async fn get(&self, id: RelationshipId) -> Result<Relationship> {
        self.ctx
            .store
            .get::<Relationship>(&id.to_string())
            .await?
            .ok_or_else(|| AtlasError::not_found("relationship", id))
    }

    pub async fn delete_relationship(&self, id: RelationshipId) -> Result<()> {
        if !self.ctx.store.delete::<Relationship>(&id.to_string()).await? {
            return Err(AtlasError::not_found("relationship", id));
        }
        tracing::debug!(id = %id, "relationship deleted");
        Ok(())
    }
}

fn outgoing_filter(source: CivilizationId) -> Filter {
    Filter::new().eq("source", source.to_string())
}
