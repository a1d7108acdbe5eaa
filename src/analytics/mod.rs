//! Population-wide attribute statistics
//!
//! Works over a point-in-time snapshot of the store. Every legal value of
//! every attribute appears in the output, including values nobody holds.

use serde::Serialize;

use crate::atlas::Context;
use crate::civilization::{CivilizationRecord, Civilizations};
use crate::core::error::Result;
use crate::schema::Attribute;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: &'static str,
    pub count: usize,
}

/// Counts per legal value of one attribute, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Histogram {
    pub attribute: Attribute,
    pub counts: Vec<ValueCount>,
}

impl Histogram {
    fn tally(attribute: Attribute, records: &[CivilizationRecord]) -> Self {
        let mut counts: Vec<ValueCount> = attribute
            .values()
            .iter()
            .map(|&value| ValueCount { value, count: 0 })
            .collect();
        for record in records {
            if let Some(value) = record.attribute(attribute) {
                counts[value.index()].count += 1;
            }
        }
        Self { attribute, counts }
    }

    pub fn count(&self, value: &str) -> Option<usize> {
        self.counts.iter().find(|c| c.value == value).map(|c| c.count)
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|c| c.count).sum()
    }

    /// Highest count, earliest declared value on ties; `None` if nobody holds any value
    pub fn most_common(&self) -> Option<&ValueCount> {
        self.counts
            .iter()
            .filter(|c| c.count > 0)
            .fold(None, |best: Option<&ValueCount>, c| match best {
                Some(b) if b.count >= c.count => Some(b),
                _ => Some(c),
            })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Statistics {
    pub total_count: usize,
    /// One per attribute, in catalog order
    pub histograms: Vec<Histogram>,
}

impl Statistics {
    pub fn histogram(&self, attribute: Attribute) -> Option<&Histogram> {
        self.histograms.iter().find(|h| h.attribute == attribute)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionEntry {
    pub value: &'static str,
    pub count: usize,
    /// Share of `total_count`, 0..=100
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Distribution {
    pub attribute: Attribute,
    pub total_count: usize,
    pub entries: Vec<DistributionEntry>,
}

impl Distribution {
    pub fn entry(&self, value: &str) -> Option<&DistributionEntry> {
        self.entries.iter().find(|e| e.value == value)
    }

    pub fn percentage_sum(&self) -> f64 {
        self.entries.iter().map(|e| e.percentage).sum()
    }
}

/// Attribute distribution analyzer
pub struct Analytics<'a> {
    ctx: &'a Context,
}

impl<'a> Analytics<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    async fn snapshot(&self) -> Result<Vec<CivilizationRecord>> {
        Civilizations::new(self.ctx).all().await
    }

    pub async fn statistics(&self) -> Result<Statistics> {
        let records = self.snapshot().await?;
        let histograms = Attribute::ALL
            .iter()
            .map(|&attribute| Histogram::tally(attribute, &records))
            .collect();
        Ok(Statistics {
            total_count: records.len(),
            histograms,
        })
    }

    pub async fn distribution(&self, attribute: &str) -> Result<Distribution> {
        let attribute = self.ctx.registry.resolve(attribute)?;
        let records = self.snapshot().await?;
        Ok(distribution_of(attribute, &records))
    }
}

fn distribution_of(attribute: Attribute, records: &[CivilizationRecord]) -> Distribution {
    let histogram = Histogram::tally(attribute, records);
    let total_count = records.len();
    let entries = histogram
        .counts
        .into_iter()
        .map(|ValueCount { value, count }| DistributionEntry {
            value,
            count,
            percentage: if total_count == 0 {
                0.0
            } else {
                count as f64 * 100.0 / total_count as f64
            },
        })
        .collect();
    Distribution {
        attribute,
        total_count,
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_common_prefers_declaration_order_on_ties() {
        let histogram = Histogram {
            attribute: Attribute::LiteracyRate,
            counts: vec![
                ValueCount { value: "none", count: 0 },
                ValueCount { value: "low", count: 3 },
                ValueCount { value: "moderate", count: 3 },
                ValueCount { value: "high", count: 1 },
                ValueCount { value: "universal", count: 0 },
            ],
        };
        assert_eq!(histogram.most_common().unwrap().value, "low");
        assert_eq!(histogram.total(), 7);
        assert_eq!(histogram.count("universal"), Some(0));
        assert_eq!(histogram.count("illiterate"), None);
    }

    #[test]
    fn test_empty_histogram_has_no_most_common() {
        let histogram = Histogram::tally(Attribute::ChangeRate, &[]);
        assert_eq!(histogram.counts.len(), Attribute::ChangeRate.values().len());
        assert!(histogram.most_common().is_none());
    }

    #[test]
    fn test_empty_population_distribution_is_all_zero() {
        let distribution = distribution_of(Attribute::TechnologyLevel, &[]);
        assert_eq!(distribution.total_count, 0);
        assert_eq!(distribution.entries.len(), 7);
        assert!(distribution.entries.iter().all(|e| e.count == 0 && e.percentage == 0.0));
    }
}
