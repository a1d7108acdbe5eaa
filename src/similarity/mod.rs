//! Weighted attribute similarity
//!
//! `score(a, b) = Σ w·(1 - d(va, vb)) / Σ w` over the considered attributes,
//! where `d` is the registry's per-attribute distance. A dimension missing on
//! either side is handled by [`MissingAttributePolicy`].
//!
//! Terms are summed in registry order on both sides, so `score(a, b)` and
//! `score(b, a)` add identical floats and agree exactly.

use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::Serialize;

use crate::atlas::Context;
use crate::civilization::{CivilizationRecord, Civilizations};
use crate::core::config::MissingAttributePolicy;
use crate::core::error::{AtlasError, Result};
use crate::core::types::CivilizationId;
use crate::schema::{Attribute, AttributeDefinition, AttributeSet, AttributeValue, SchemaRegistry};

/// Pure scoring over attribute sets
#[derive(Debug, Clone, Copy)]
pub struct SimilarityScorer<'a> {
    registry: &'a SchemaRegistry,
    policy: MissingAttributePolicy,
}

impl<'a> SimilarityScorer<'a> {
    pub fn new(registry: &'a SchemaRegistry, policy: MissingAttributePolicy) -> Self {
        Self { registry, policy }
    }

    /// Similarity in [0, 1] across every registry attribute
    pub fn score(&self, a: &AttributeSet, b: &AttributeSet) -> f64 {
        self.score_over(self.registry.definitions(), a, b)
    }

    /// Similarity restricted to `focus`
    pub fn score_focused(&self, focus: &[Attribute], a: &AttributeSet, b: &AttributeSet) -> f64 {
        self.score_over(
            self.registry
                .definitions()
                .filter(|definition| focus.contains(&definition.attribute)),
            a,
            b,
        )
    }

    fn score_over<'d, I>(&self, definitions: I, a: &AttributeSet, b: &AttributeSet) -> f64
    where
        I: Iterator<Item = &'d AttributeDefinition>,
    {
        let mut weighted = 0.0;
        let mut total = 0.0;
        for definition in definitions {
            if let Some((similarity, weight)) = self.term(definition, a, b) {
                weighted += similarity * weight;
                total += weight;
            }
        }
        if total <= 0.0 {
            return 0.0;
        }
        (weighted / total).clamp(0.0, 1.0)
    }

    /// (similarity, weight) for one dimension, or `None` when it is skipped
    fn term(&self, definition: &AttributeDefinition, a: &AttributeSet, b: &AttributeSet) -> Option<(f64, f64)> {
        match (a.get(definition.attribute), b.get(definition.attribute)) {
            (Some(va), Some(vb)) => Some((1.0 - definition.distance(va, vb), definition.weight)),
            _ => match self.policy {
                MissingAttributePolicy::MaxDistance => Some((0.0, definition.weight)),
                MissingAttributePolicy::Skip => None,
            },
        }
    }

    /// Per-attribute breakdown in registry order
    pub fn breakdown(&self, a: &AttributeSet, b: &AttributeSet) -> Vec<AttributeComparison> {
        self.registry
            .definitions()
            .map(|definition| {
                let left = a.get(definition.attribute);
                let right = b.get(definition.attribute);
                let similarity = self.term(definition, a, b).map(|(s, _)| s);
                AttributeComparison {
                    attribute: definition.attribute,
                    left,
                    right,
                    similarity,
                    weight: definition.weight,
                }
            })
            .collect()
    }
}

/// One ranked neighbour
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarMatch {
    pub id: CivilizationId,
    pub name: String,
    pub score: f64,
}

/// How two records relate on one attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeComparison {
    pub attribute: Attribute,
    pub left: Option<AttributeValue>,
    pub right: Option<AttributeValue>,
    /// `None` when the dimension was skipped
    pub similarity: Option<f64>,
    pub weight: f64,
}

impl AttributeComparison {
    pub fn is_identical(&self) -> bool {
        self.left.is_some() && self.left == self.right
    }
}

/// Full comparison of two records
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub left: CivilizationId,
    pub right: CivilizationId,
    pub score: f64,
    pub attributes: Vec<AttributeComparison>,
}

impl Comparison {
    /// Attributes on which both records hold the same value
    pub fn similarities(&self) -> impl Iterator<Item = &AttributeComparison> {
        self.attributes.iter().filter(|c| c.is_identical())
    }

    pub fn differences(&self) -> impl Iterator<Item = &AttributeComparison> {
        self.attributes.iter().filter(|c| !c.is_identical())
    }
}

/// Similarity ranking over the stored population
pub struct Similarity<'a> {
    ctx: &'a Context,
}

impl<'a> Similarity<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    pub fn scorer(&self) -> SimilarityScorer<'a> {
        SimilarityScorer::new(&self.ctx.registry, self.ctx.config.missing_attribute)
    }

    fn civilizations(&self) -> Civilizations<'a> {
        Civilizations::new(self.ctx)
    }

    pub async fn score(&self, a: CivilizationId, b: CivilizationId) -> Result<f64> {
        let left = self.civilizations().get(a).await?;
        let right = self.civilizations().get(b).await?;
        Ok(self.scorer().score(&left.attributes, &right.attributes))
    }

    pub async fn compare(&self, a: CivilizationId, b: CivilizationId) -> Result<Comparison> {
        let left = self.civilizations().get(a).await?;
        let right = self.civilizations().get(b).await?;
        let scorer = self.scorer();
        Ok(Comparison {
            left: a,
            right: b,
            score: scorer.score(&left.attributes, &right.attributes),
            attributes: scorer.breakdown(&left.attributes, &right.attributes),
        })
    }

    /// Up to `top_k` other records scoring at least `min_threshold`
    ///
    /// Ranked by score descending, ties by id ascending. `min_threshold`
    /// defaults to the configured `similarity_threshold`.
    pub async fn find_similar(
        &self,
        id: CivilizationId,
        top_k: usize,
        min_threshold: Option<f64>,
    ) -> Result<Vec<SimilarMatch>> {
        self.rank(id, top_k, min_threshold, None).await
    }

    /// `find_similar` scored only over the named attributes
    pub async fn find_similar_focused(
        &self,
        id: CivilizationId,
        top_k: usize,
        min_threshold: Option<f64>,
        focus: &[&str],
    ) -> Result<Vec<SimilarMatch>> {
        let attributes = focus
            .iter()
            .map(|name| self.ctx.registry.resolve(name))
            .collect::<Result<Vec<_>>>()?;
        if attributes.is_empty() {
            return Err(AtlasError::validation("focus", "name at least one attribute"));
        }
        let focused_weight: f64 = attributes.iter().map(|a| self.ctx.registry.weight(*a)).sum();
        if focused_weight <= 0.0 {
            return Err(AtlasError::validation("focus", "focused attributes carry no weight"));
        }
        self.rank(id, top_k, min_threshold, Some(&attributes)).await
    }

    async fn rank(
        &self,
        id: CivilizationId,
        top_k: usize,
        min_threshold: Option<f64>,
        focus: Option<&[Attribute]>,
    ) -> Result<Vec<SimilarMatch>> {
        let threshold = min_threshold.unwrap_or(self.ctx.config.similarity_threshold);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AtlasError::validation(
                "min_threshold",
                format!("{} is outside [0, 1]", threshold),
            ));
        }

        let target = self.civilizations().get(id).await?;
        let population = self.civilizations().all().await?;
        let candidates: Vec<&CivilizationRecord> =
            population.iter().filter(|record| record.id != id).collect();

        let scorer = self.scorer();
        let score = |record: &&CivilizationRecord| -> Option<SimilarMatch> {
            let score = match focus {
                Some(focus) => scorer.score_focused(focus, &target.attributes, &record.attributes),
                None => scorer.score(&target.attributes, &record.attributes),
            };
            (score >= threshold).then(|| SimilarMatch {
                id: record.id,
                name: record.name.clone(),
                score,
            })
        };

        let mut matches: Vec<SimilarMatch> = if candidates.len() >= self.ctx.config.parallel_threshold {
            candidates.par_iter().filter_map(score).collect()
        } else {
            candidates.iter().filter_map(score).collect()
        };

        matches.sort_by(|a, b| {
            OrderedFloat(b.score)
                .cmp(&OrderedFloat(a.score))
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);

        tracing::debug!(
            id = %id,
            population = population.len(),
            returned = matches.len(),
            threshold,
            "similarity ranking"
        );
        Ok(matches)
    }
}
