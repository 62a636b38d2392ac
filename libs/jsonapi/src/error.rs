use http::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::validation::FieldErrors;
use crate::value::{RecordId, SerializeError};

/// Field errors of a rejected payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    /// Update: one mapping.
    Single(FieldErrors),
    /// Create: one mapping per submitted item, `{}` for the valid ones.
    Batch(Vec<FieldErrors>),
}

impl ValidationFailure {
    pub fn to_json(&self) -> Value {
        match self {
            Self::Single(e) => e.to_json(),
            Self::Batch(items) => Value::Array(items.iter().map(FieldErrors::to_json).collect()),
        }
    }
}

/// Failures a dispatch can end in.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request body has no `{resource}` member")]
    Structural { resource: String },

    #[error("payload failed validation")]
    Invalid(ValidationFailure),

    #[error("record {id} not found")]
    NotFound { id: String },

    #[error("{operation} is not allowed here")]
    NotAllowed { operation: String },

    #[error("serialization failed: {0}")]
    Serialization(#[from] SerializeError),

    #[error("provider failure: {0:#}")]
    Provider(#[from] anyhow::Error),
}

impl ApiError {
    pub fn structural(resource: impl Into<String>) -> Self {
        Self::Structural {
            resource: resource.into(),
        }
    }

    pub fn not_found(id: impl ToString) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    pub fn not_found_id(id: RecordId) -> Self {
        Self::not_found(id)
    }

    pub fn not_allowed(operation: impl Into<String>) -> Self {
        Self::NotAllowed {
            operation: operation.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Structural { .. } | Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::NotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Serialization(_) | Self::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Internal failures are configuration or storage bugs, not user input.
    pub fn is_internal(&self) -> bool {
        self.status().is_server_error()
    }
}
