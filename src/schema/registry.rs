//! Attribute schema registry
//!
//! Binds every catalog dimension to a similarity weight and a distance
//! function. Built once at startup (builtin defaults plus config overrides)
//! and shared read-only afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::attribute_set::{AttributeSet, RawAttributes};
use super::catalog::{Attribute, AttributeValue, Category};
use crate::core::config::AttributeOverride;
use crate::core::error::{AtlasError, Result};

/// Which distance function a dimension uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeOrdering {
    /// Equal or not: distance is 0 or 1
    Nominal,
    /// Values are ranked; distance is the normalized rank gap
    Ordinal,
}

/// Dimensions whose values have a natural order out of the box.
///
/// Everything else is nominal. Getting this wrong silently flattens
/// similarity, so the registry tests pin both sides of the list.
pub const DEFAULT_ORDINAL: &[Attribute] = &[
    Attribute::PopulationDensity,
    Attribute::CentralizationLevel,
    Attribute::TradeOrientation,
    Attribute::ReligiousInfluence,
    Attribute::LiteracyRate,
    Attribute::TechnologyLevel,
    Attribute::PrimaryWeapons,
    Attribute::LanguageComplexity,
    Attribute::PopulationSize,
    Attribute::LifeExpectancy,
    Attribute::TechnologicalAdoption,
    Attribute::ExternalRelations,
    Attribute::ChangeRate,
];

const DEFAULT_WEIGHT: f64 = 1.0;

/// How one dimension participates in similarity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeDefinition {
    pub attribute: Attribute,
    pub weight: f64,
    pub ordering: AttributeOrdering,
    /// Rank per value, indexed by declaration order; present only when ordinal
    ranks: Option<Vec<u32>>,
    #[serde(skip)]
    rank_span: u32,
}

impl AttributeDefinition {
    fn nominal(attribute: Attribute, weight: f64) -> Self {
        Self {
            attribute,
            weight,
            ordering: AttributeOrdering::Nominal,
            ranks: None,
            rank_span: 0,
        }
    }

    fn ordinal(attribute: Attribute, weight: f64, ranks: Vec<u32>) -> Self {
        let min = ranks.iter().copied().min().unwrap_or(0);
        let max = ranks.iter().copied().max().unwrap_or(0);
        Self {
            attribute,
            weight,
            ordering: AttributeOrdering::Ordinal,
            ranks: Some(ranks),
            rank_span: max - min,
        }
    }

    fn declaration_ranks(attribute: Attribute) -> Vec<u32> {
        (0..attribute.values().len() as u32).collect()
    }

    pub fn name(&self) -> &'static str {
        self.attribute.name()
    }

    pub fn values(&self) -> &'static [&'static str] {
        self.attribute.values()
    }

    pub fn rank_of(&self, value: AttributeValue) -> Option<u32> {
        self.ranks
            .as_ref()
            .and_then(|ranks| ranks.get(value.index()).copied())
    }

    /// Distance in [0, 1] between two values of this dimension
    pub fn distance(&self, a: AttributeValue, b: AttributeValue) -> f64 {
        debug_assert_eq!(a.attribute(), self.attribute);
        debug_assert_eq!(b.attribute(), self.attribute);

        if a == b {
            return 0.0;
        }
        match (self.rank_of(a), self.rank_of(b)) {
            (Some(ra), Some(rb)) => {
                if self.rank_span == 0 {
                    0.0
                } else {
                    f64::from(ra.abs_diff(rb)) / f64::from(self.rank_span)
                }
            }
            _ => 1.0,
        }
    }
}

/// Public description of one attribute, for building dynamic filters
#[derive(Debug, Clone, Serialize)]
pub struct AttributeInfo {
    pub name: &'static str,
    pub values: &'static [&'static str],
    pub ordering: AttributeOrdering,
    pub weight: f64,
}

/// One catalog category with its attributes
#[derive(Debug, Clone, Serialize)]
pub struct CategoryInfo {
    pub category: Category,
    pub label: &'static str,
    pub attributes: Vec<AttributeInfo>,
}

/// Immutable catalog of attribute definitions
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    /// Indexed by `Attribute as usize`
    definitions: Vec<AttributeDefinition>,
    total_weight: f64,
}

impl SchemaRegistry {
    /// Builtin weights (all 1.0) and orderings
    pub fn builtin() -> Self {
        let definitions: Vec<AttributeDefinition> = Attribute::ALL
            .iter()
            .map(|&attribute| {
                if DEFAULT_ORDINAL.contains(&attribute) {
                    AttributeDefinition::ordinal(
                        attribute,
                        DEFAULT_WEIGHT,
                        AttributeDefinition::declaration_ranks(attribute),
                    )
                } else {
                    AttributeDefinition::nominal(attribute, DEFAULT_WEIGHT)
                }
            })
            .collect();
        let total_weight = definitions.iter().map(|d| d.weight).sum();
        Self {
            definitions,
            total_weight,
        }
    }

    /// Builtin registry with config overrides applied
    pub fn with_overrides(overrides: &BTreeMap<String, AttributeOverride>) -> Result<Self> {
        let mut registry = Self::builtin();
        for (name, entry) in overrides {
            let attribute = Attribute::from_name(name).ok_or_else(|| {
                AtlasError::Config(format!("override for unknown attribute `{}`", name))
            })?;
            registry.apply_override(attribute, entry)?;
            tracing::debug!(attribute = name.as_str(), "applied registry override");
        }

        registry.total_weight = registry.definitions.iter().map(|d| d.weight).sum();
        if registry.total_weight <= 0.0 {
            return Err(AtlasError::Config(
                "attribute weights must not all be zero".into(),
            ));
        }
        Ok(registry)
    }

    fn apply_override(&mut self, attribute: Attribute, entry: &AttributeOverride) -> Result<()> {
        let current = &self.definitions[attribute as usize];
        let weight = entry.weight.unwrap_or(current.weight);
        if !weight.is_finite() || weight < 0.0 {
            return Err(AtlasError::Config(format!(
                "weight for `{}` must be a non-negative number, got {}",
                attribute, weight
            )));
        }

        let ordering = match (entry.ordering, &entry.ranks) {
            (Some(ordering), _) => ordering,
            (None, Some(_)) => AttributeOrdering::Ordinal,
            (None, None) => current.ordering,
        };

        let definition = match ordering {
            AttributeOrdering::Nominal => {
                if entry.ranks.is_some() {
                    return Err(AtlasError::Config(format!(
                        "`{}` is nominal but ranks were supplied",
                        attribute
                    )));
                }
                AttributeDefinition::nominal(attribute, weight)
            }
            AttributeOrdering::Ordinal => {
                let ranks = match &entry.ranks {
                    Some(explicit) => Self::resolve_ranks(attribute, explicit)?,
                    None => current
                        .ranks
                        .clone()
                        .unwrap_or_else(|| AttributeDefinition::declaration_ranks(attribute)),
                };
                AttributeDefinition::ordinal(attribute, weight, ranks)
            }
        };

        self.definitions[attribute as usize] = definition;
        Ok(())
    }

    fn resolve_ranks(attribute: Attribute, explicit: &BTreeMap<String, u32>) -> Result<Vec<u32>> {
        if let Some(unknown) = explicit
            .keys()
            .find(|value| attribute.parse_value(value).is_none())
        {
            return Err(AtlasError::Config(format!(
                "rank given for `{}`, which is not a legal {}",
                unknown, attribute
            )));
        }
        attribute
            .values()
            .iter()
            .map(|value| {
                explicit.get(*value).copied().ok_or_else(|| {
                    AtlasError::Config(format!("no rank given for {} `{}`", attribute, value))
                })
            })
            .collect()
    }

    pub fn definition(&self, attribute: Attribute) -> &AttributeDefinition {
        &self.definitions[attribute as usize]
    }

    pub fn definitions(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.definitions.iter()
    }

    /// Sum of every attribute's weight
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn weight(&self, attribute: Attribute) -> f64 {
        self.definition(attribute).weight
    }

    pub fn list_values(&self, attribute: Attribute) -> &'static [&'static str] {
        attribute.values()
    }

    /// Resolve an attribute name referenced by a query
    pub fn resolve(&self, name: &str) -> Result<Attribute> {
        name.parse()
    }

    /// Check that `value` is legal for the attribute called `name`
    pub fn validate(&self, name: &str, value: &str) -> Result<AttributeValue> {
        let attribute = Attribute::from_name(name)
            .ok_or_else(|| AtlasError::validation(name, "unknown attribute"))?;
        attribute.parse_value(value).ok_or_else(|| {
            AtlasError::validation(
                name,
                format!(
                    "`{}` is not one of [{}]",
                    value,
                    attribute.values().join(", ")
                ),
            )
        })
    }

    /// Validate a whole raw mapping
    ///
    /// With `require_complete`, every catalog attribute must be present; the
    /// first missing one (in catalog order) is reported.
    pub fn parse_attributes(&self, raw: &RawAttributes, require_complete: bool) -> Result<AttributeSet> {
        let mut set = AttributeSet::new();
        for (name, value) in raw {
            set.insert(self.validate(name, value)?);
        }
        if require_complete {
            Self::ensure_complete(&set)?;
        }
        Ok(set)
    }

    /// Every catalog attribute must carry a value
    pub fn ensure_complete(set: &AttributeSet) -> Result<()> {
        match set.missing().next() {
            Some(missing) => Err(AtlasError::validation(
                missing.name(),
                "required attribute has no value",
            )),
            None => Ok(()),
        }
    }

    /// Distance between two raw values of one attribute
    pub fn ordinal_distance(&self, attribute: Attribute, v1: &str, v2: &str) -> Result<f64> {
        let a = self.validate(attribute.name(), v1)?;
        let b = self.validate(attribute.name(), v2)?;
        Ok(self.definition(attribute).distance(a, b))
    }

    /// Catalog grouped by category
    pub fn catalog(&self) -> Vec<CategoryInfo> {
        Category::ALL
            .iter()
            .map(|&category| CategoryInfo {
                category,
                label: category.label(),
                attributes: category
                    .attributes()
                    .map(|attribute| {
                        let definition = self.definition(attribute);
                        AttributeInfo {
                            name: attribute.name(),
                            values: attribute.values(),
                            ordering: definition.ordering,
                            weight: definition.weight,
                        }
                    })
                    .collect(),
            })
            .collect()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
