//! Attribute schema: the closed catalog of dimensions and the registry that
//! weights them for similarity.

pub mod attribute_set;
pub mod catalog;
pub mod registry;

pub use attribute_set::{AttributeSet, RawAttributes};
pub use catalog::*;
pub use registry::{
    AttributeDefinition, AttributeInfo, AttributeOrdering, CategoryInfo, SchemaRegistry,
    DEFAULT_ORDINAL,
};
