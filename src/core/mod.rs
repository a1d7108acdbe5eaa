pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AtlasConfig, AttributeOverride, HistoryOverflow, MissingAttributePolicy};
pub use error::{AtlasError, Result};
pub use types::{CivilizationId, EventId, Page, RelationshipId, Timestamp};
