//! Typed failures for query-option parsing and pagination.

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Identifies which request input triggered an error, per the API error
/// contract's `source` object.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ErrorSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ErrorSource {
    pub fn parameter(parameter: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: None,
            parameter: Some(parameter.into()),
            value: Some(value.into()),
        }
    }

    pub fn attribute(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: Some(attribute.into()),
            parameter: None,
            value: Some(value.into()),
        }
    }
}

/// Failures raised while building a query descriptor or pagination links.
///
/// All variants except [`QueryError::UnknownResourceType`] are per-request
/// validation failures (HTTP 422, or 404 for [`QueryError::PageOutOfBounds`]);
/// `UnknownResourceType` is a process configuration error and maps to 500.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("resource type '{0}' has no query configuration")]
    UnknownResourceType(String),

    #[error("'{value}' is not an accessible field of {resource}")]
    UnknownField {
        /// Query parameter that named the field (`sort`, `filter`, `fields[..]`).
        parameter: String,
        resource: String,
        value: String,
    },

    #[error("'{value}' is not an includable relation of {resource}")]
    UnknownRelation { resource: String, value: String },

    #[error("fields must map resource types to field lists, got a bare value")]
    InvalidFieldsParameter { value: String },

    #[error("'{value}' names neither the requested resource nor one of its relations")]
    UnknownFieldsType { value: String },

    #[error("page {page} is out of bounds, last page is {last}")]
    PageOutOfBounds { page: u64, last: u64 },
}

impl QueryError {
    /// The `source` object for the API error body, when the failure can be
    /// tied to a concrete request input.
    pub fn source(&self) -> Option<ErrorSource> {
        match self {
            QueryError::UnknownResourceType(_) => None,
            QueryError::UnknownField {
                parameter, value, ..
            } => Some(ErrorSource::parameter(parameter.clone(), value.clone())),
            QueryError::UnknownRelation { value, .. } => {
                Some(ErrorSource::parameter("include", value.clone()))
            }
            QueryError::InvalidFieldsParameter { value } => {
                Some(ErrorSource::parameter("fields", value.clone()))
            }
            QueryError::UnknownFieldsType { value } => {
                Some(ErrorSource::parameter("fields", value.clone()))
            }
            QueryError::PageOutOfBounds { page, .. } => {
                Some(ErrorSource::parameter("page", page.to_string()))
            }
        }
    }
}
