use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("Validation failed for `{field}`: {message}")]
    Validation { field: String, message: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    Conflict { kind: &'static str, id: String },

    #[error("Limit exceeded for {entity}: at most {limit} {what}")]
    LimitExceeded {
        what: &'static str,
        entity: String,
        limit: usize,
    },

    #[error("Unknown attribute: {0}")]
    InvalidAttribute(String),

    #[error("Invalid argument `{field}`: {message}")]
    InvalidArgument { field: String, message: String },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl AtlasError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn conflict(kind: &'static str, id: impl ToString) -> Self {
        Self::Conflict {
            kind,
            id: id.to_string(),
        }
    }

    /// The offending field for validation-style failures
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } | Self::InvalidArgument { field, .. } => Some(field),
            Self::InvalidAttribute(name) => Some(name),
            _ => None,
        }
    }
}

impl From<StoreError> for AtlasError {
    fn from(e: StoreError) -> Self {
        AtlasError::ServiceUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AtlasError>;
