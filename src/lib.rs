//! Civ Atlas - attribute similarity, faceted query, and analytics engine
//! for richly attributed civilization records

pub mod analytics;
pub mod atlas;
pub mod civilization;
pub mod core;
pub mod history;
pub mod query;
pub mod relations;
pub mod schema;
pub mod seed;
pub mod similarity;
pub mod store;
pub mod templates;

pub use crate::atlas::Atlas;
pub use crate::core::error::{AtlasError, Result};
