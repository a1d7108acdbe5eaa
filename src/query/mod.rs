//! Faceted search over civilization records
//!
//! A record matches when, for every faceted attribute, its value is in the
//! accepted set, AND the free text (if any) occurs in its name or
//! description, AND it carries the requested tag (if any). Facets with a
//! single accepted value are pushed down to the store as equality filters;
//! everything else is evaluated in process over the returned working set.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::atlas::Context;
use crate::civilization::{sort_recent_first, CivilizationRecord};
use crate::core::config::AtlasConfig;
use crate::core::error::{AtlasError, Result};
use crate::core::types::Page;
use crate::schema::{Attribute, AttributeValue};
use crate::store::Filter;

/// Search parameters as received from a caller
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Attribute name -> accepted values
    pub filters: BTreeMap<String, BTreeSet<String>>,
    pub free_text: Option<String>,
    pub tag: Option<String>,
    /// 1-based
    pub page: usize,
    /// Falls back to `default_page_size`
    pub page_size: Option<usize>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            filters: BTreeMap::new(),
            free_text: None,
            tag: None,
            page: 1,
            page_size: None,
        }
    }
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept any of `values` for `attribute`
    pub fn facet<I, S>(mut self, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters
            .entry(attribute.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn text(mut self, free_text: impl Into<String>) -> Self {
        self.free_text = Some(free_text.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }
}

/// Validated page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
}

impl Pagination {
    /// Reject zero pages or sizes and clamp the size to `max_page_size`
    pub fn resolve(config: &AtlasConfig, page: usize, page_size: Option<usize>) -> Result<Self> {
        if page == 0 {
            return Err(AtlasError::validation("page", "pages are numbered from 1"));
        }
        let requested = page_size.unwrap_or(config.default_page_size);
        if requested == 0 {
            return Err(AtlasError::validation("page_size", "must be at least 1"));
        }
        Ok(Self {
            page,
            page_size: requested.min(config.max_page_size),
        })
    }

    /// Slice an ordered result set; only the first `reachable` items are addressable
    pub fn apply<T>(self, items: Vec<T>, reachable: usize) -> Page<T> {
        let total_count = items.len();
        let reachable = reachable.min(total_count);
        let start = (self.page - 1).saturating_mul(self.page_size);

        let items = if start >= reachable {
            Vec::new()
        } else {
            let end = start.saturating_add(self.page_size).min(reachable);
            items.into_iter().skip(start).take(end - start).collect()
        };

        Page {
            items,
            total_count,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

/// One compiled facet
#[derive(Debug)]
struct Facet {
    attribute: Attribute,
    accepted: Vec<AttributeValue>,
}

impl Facet {
    fn matches(&self, record: &CivilizationRecord) -> bool {
        record
            .attribute(self.attribute)
            .map(|value| self.accepted.contains(&value))
            .unwrap_or(false)
    }
}

/// A search request validated against the registry
#[derive(Debug)]
struct CompiledSearch {
    facets: Vec<Facet>,
    needle: Option<String>,
    tag: Option<String>,
    pagination: Pagination,
}

impl CompiledSearch {
    fn pushdown(&self) -> Filter {
        self.facets
            .iter()
            .filter(|facet| facet.accepted.len() == 1)
            .fold(Filter::new(), |filter, facet| {
                filter.eq(
                    format!("attributes.{}", facet.attribute.name()),
                    Value::from(facet.accepted[0].as_str()),
                )
            })
    }

    fn matches(&self, record: &CivilizationRecord) -> bool {
        if !self.facets.iter().all(|facet| facet.matches(record)) {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !record.has_tag(tag) {
                return false;
            }
        }
        if let Some(needle) = &self.needle {
            let in_name = record.name.to_lowercase().contains(needle);
            let in_description = record
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(needle))
                .unwrap_or(false);
            if !in_name && !in_description {
                return false;
            }
        }
        true
    }
}

/// Faceted query engine
pub struct Query<'a> {
    ctx: &'a Context,
}

impl<'a> Query<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    fn compile(&self, request: &SearchRequest) -> Result<CompiledSearch> {
        let registry = &self.ctx.registry;

        let mut facets = Vec::with_capacity(request.filters.len());
        for (name, values) in &request.filters {
            let attribute = registry.resolve(name)?;
            if values.is_empty() {
                return Err(AtlasError::validation(
                    name.as_str(),
                    "facet must accept at least one value",
                ));
            }
            let accepted = values
                .iter()
                .map(|value| registry.validate(name, value))
                .collect::<Result<Vec<_>>>()?;
            facets.push(Facet { attribute, accepted });
        }

        let needle = request
            .free_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_lowercase);
        let tag = request
            .tag
            .as_deref()
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string);

        Ok(CompiledSearch {
            facets,
            needle,
            tag,
            pagination: Pagination::resolve(&self.ctx.config, request.page, request.page_size)?,
        })
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<Page<CivilizationRecord>> {
        let compiled = self.compile(request)?;
        let pushdown = compiled.pushdown();

        let mut matches: Vec<CivilizationRecord> = self
            .ctx
            .store
            .query::<CivilizationRecord>(&pushdown)
            .await?
            .into_iter()
            .filter(|record| compiled.matches(record))
            .collect();
        sort_recent_first(&mut matches);

        tracing::debug!(
            facets = compiled.facets.len(),
            pushed_down = pushdown.clauses().len(),
            matches = matches.len(),
            "search evaluated"
        );
        Ok(compiled.pagination.apply(matches, self.ctx.config.search_limit))
    }

    /// Single-facet search
    pub async fn get_by_attribute(
        &self,
        attribute: &str,
        value: &str,
        page: usize,
        page_size: Option<usize>,
    ) -> Result<Page<CivilizationRecord>> {
        let mut request = SearchRequest::new().facet(attribute, [value]).page(page);
        request.page_size = page_size;
        self.search(&request).await
    }
}
