//! A civilization's attribute values, one per dimension at most

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::catalog::{Attribute, AttributeValue};

/// Attribute name -> raw value, as received from callers before validation
pub type RawAttributes = BTreeMap<String, String>;

/// Validated attribute values keyed by dimension
///
/// Holding an `AttributeValue` guarantees the value is legal for its
/// dimension, so a set can be partial (templates) or complete (records) but
/// never illegal. Serialized as a flat `name -> value` map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet {
    values: BTreeMap<Attribute, AttributeValue>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value for the same dimension
    pub fn insert(&mut self, value: impl Into<AttributeValue>) -> Option<AttributeValue> {
        let value = value.into();
        self.values.insert(value.attribute(), value)
    }

    /// Builder-style `insert`
    pub fn with(mut self, value: impl Into<AttributeValue>) -> Self {
        self.insert(value);
        self
    }

    pub fn get(&self, attribute: Attribute) -> Option<AttributeValue> {
        self.values.get(&attribute).copied()
    }

    pub fn remove(&mut self, attribute: Attribute) -> Option<AttributeValue> {
        self.values.remove(&attribute)
    }

    pub fn contains(&self, attribute: Attribute) -> bool {
        self.values.contains_key(&attribute)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when every catalog dimension has a value
    pub fn is_complete(&self) -> bool {
        self.values.len() == Attribute::ALL.len()
    }

    /// Dimensions without a value, in catalog order
    pub fn missing(&self) -> impl Iterator<Item = Attribute> + '_ {
        Attribute::ALL
            .iter()
            .copied()
            .filter(move |attribute| !self.values.contains_key(attribute))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, AttributeValue)> + '_ {
        self.values.iter().map(|(attribute, value)| (*attribute, *value))
    }

    /// Overlay `other` on top of `self`; `other` wins on conflict
    pub fn merged_with(&self, other: &AttributeSet) -> AttributeSet {
        let mut merged = self.clone();
        for (_, value) in other.iter() {
            merged.insert(value);
        }
        merged
    }

    /// Back to the wire representation
    pub fn to_raw(&self) -> RawAttributes {
        self.iter()
            .map(|(attribute, value)| (attribute.name().to_string(), value.as_str().to_string()))
            .collect()
    }
}

impl FromIterator<AttributeValue> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = AttributeValue>>(iter: I) -> Self {
        let mut set = AttributeSet::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

impl Serialize for AttributeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.values
                .iter()
                .map(|(attribute, value)| (attribute.name(), value.as_str())),
        )
    }
}

impl<'de> Deserialize<'de> for AttributeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawAttributes::deserialize(deserializer)?;
        let mut set = AttributeSet::new();
        for (name, value) in raw {
            let attribute = Attribute::from_name(&name)
                .ok_or_else(|| D::Error::custom(format!("unknown attribute `{}`", name)))?;
            let parsed = attribute.parse_value(&value).ok_or_else(|| {
                D::Error::custom(format!("`{}` is not a legal {}", value, name))
            })?;
            set.insert(parsed);
        }
        Ok(set)
    }
}
