//! Named attribute presets
//!
//! A template's defaults may be partial. Instantiation overlays caller
//! overrides on the defaults and the merged set must then be complete.

use serde::{Deserialize, Serialize};

use crate::atlas::Context;
use crate::civilization::{CivilizationDraft, CivilizationRecord, Civilizations};
use crate::core::error::{AtlasError, Result};
use crate::core::types::Timestamp;
use crate::schema::{AttributeSet, RawAttributes, SchemaRegistry};
use crate::store::{Collection, Document, Filter};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub description: Option<String>,
    pub defaults: AttributeSet,
    pub created_at: Timestamp,
}

impl Document for Template {
    const COLLECTION: Collection = Collection::Templates;

    fn key(&self) -> String {
        self.name.clone()
    }
}

/// Template engine
pub struct Templates<'a> {
    ctx: &'a Context,
}

impl<'a> Templates<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    pub async fn create_template(
        &self,
        name: &str,
        description: Option<&str>,
        defaults: &RawAttributes,
    ) -> Result<Template> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AtlasError::validation("name", "must not be empty"));
        }
        if name.chars().count() > self.ctx.config.max_name_length {
            return Err(AtlasError::validation(
                "name",
                format!("longer than {} characters", self.ctx.config.max_name_length),
            ));
        }
        let defaults = self.ctx.registry.parse_attributes(defaults, false)?;

        let template = Template {
            name: name.to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            defaults,
            created_at: self.ctx.clock.now(),
        };
        if !self.ctx.store.insert(&template).await? {
            return Err(AtlasError::conflict("template", name));
        }
        tracing::info!(name, defaults = template.defaults.len(), "template created");
        Ok(template)
    }

    /// Every template, by name
    pub async fn list_templates(&self) -> Result<Vec<Template>> {
        let mut templates = self.ctx.store.query::<Template>(&Filter::all()).await?;
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    pub async fn get_template(&self, name: &str) -> Result<Template> {
        self.ctx
            .store
            .get::<Template>(name)
            .await?
            .ok_or_else(|| AtlasError::not_found("template", name))
    }

    pub async fn delete_template(&self, name: &str) -> Result<()> {
        if !self.ctx.store.delete::<Template>(name).await? {
            return Err(AtlasError::not_found("template", name));
        }
        Ok(())
    }

    /// New record named after the template
    pub async fn instantiate(&self, template: &str, overrides: &RawAttributes) -> Result<CivilizationRecord> {
        self.instantiate_as(template, template, overrides).await
    }

    /// New record called `name`, seeded from `template` with `overrides` on top
    pub async fn instantiate_as(
        &self,
        template: &str,
        name: &str,
        overrides: &RawAttributes,
    ) -> Result<CivilizationRecord> {
        let template = self.get_template(template).await?;
        let overrides = self.ctx.registry.parse_attributes(overrides, false)?;
        let merged = template.defaults.merged_with(&overrides);
        SchemaRegistry::ensure_complete(&merged)?;

        let mut draft = CivilizationDraft::from_attributes(name, &merged);
        draft.description = template.description.clone();
        let record = Civilizations::new(self.ctx).create(&draft).await?;

        tracing::debug!(template = template.name.as_str(), id = %record.id, "template instantiated");
        Ok(record)
    }
}
