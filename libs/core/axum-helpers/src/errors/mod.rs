pub mod handlers;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Error as UuidError;
use validator::ValidationErrors;

use access_control::AccessError;
use query_options::{ErrorSource, QueryError};

/// A single error object inside an error document.
///
/// # JSON Example
///
/// ```json
/// {
///   "title": "Invalid Query/Body",
///   "detail": "sort field 'secret' is not allowed for resource 'product'",
///   "status": "422",
///   "source": { "parameter": "sort", "value": "secret" }
/// }
/// ```
#[derive(Serialize, ToSchema)]
pub struct ErrorObject {
    /// Short, stable summary of the error class
    pub title: String,
    /// Human-readable description of this occurrence
    pub detail: String,
    /// HTTP status code as a string
    pub status: String,
    /// Which query parameter or body attribute caused the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
    /// Optional structured context (e.g. the out-of-bounds page number)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

/// Error response body: every error the API returns uses this envelope.
#[derive(Serialize, ToSchema)]
pub struct ErrorDocument {
    pub errors: Vec<ErrorObject>,
}

impl ErrorDocument {
    pub fn single(
        title: impl Into<String>,
        detail: impl Into<String>,
        status: StatusCode,
        source: Option<ErrorSource>,
        meta: Option<serde_json::Value>,
    ) -> Self {
        Self {
            errors: vec![ErrorObject {
                title: title.into(),
                detail: detail.into(),
                status: status.as_u16().to_string(),
                source,
                meta,
            }],
        }
    }
}

/// Conflict responses use 419 rather than 409, matching the public API contract
/// clients already depend on.
pub const CONFLICT_STATUS: u16 = 419;

/// Application error type that converts into HTTP error documents.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    /// Request body or query parameters failed validation (422)
    #[error("Validation error: {detail}")]
    Validation {
        detail: String,
        // Named `error_source` rather than `source` because thiserror treats a
        // field named `source` as the Error::source cause, which this is not.
        error_source: Option<ErrorSource>,
    },

    #[error("Not Found: {0}")]
    NotFound(String),

    /// Requested page exceeds the collection's last page (404)
    #[error("page {page} is out of bounds, last page is {last}")]
    PageOutOfBounds { page: u64, last: u64 },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    NotAuthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("JSON extraction error: {0}")]
    JsonExtractorRejection(#[from] JsonRejection),

    #[error("Validation error: {0}")]
    ValidationErrors(#[from] ValidationErrors),

    #[error("UUID error: {0}")]
    UuidError(#[from] UuidError),

    #[error("JSON parsing error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation {
            detail: detail.into(),
            error_source: None,
        }
    }

    pub fn validation_with_source(detail: impl Into<String>, source: ErrorSource) -> Self {
        Self::Validation {
            detail: detail.into(),
            error_source: Some(source),
        }
    }

    fn conflict_status() -> StatusCode {
        StatusCode::from_u16(CONFLICT_STATUS).unwrap_or(StatusCode::CONFLICT)
    }
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::PageOutOfBounds { page, last } => AppError::PageOutOfBounds { page, last },
            // A resource type missing from the registry is a wiring bug, not
            // client input.
            QueryError::UnknownResourceType(resource) => {
                AppError::Internal(format!("resource type '{}' is not registered", resource))
            }
            other => {
                let source = other.source();
                AppError::Validation {
                    detail: other.to_string(),
                    error_source: source,
                }
            }
        }
    }
}

impl From<AccessError> for AppError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Forbidden => {
                AppError::Forbidden("You are not allowed to perform this action".to_string())
            }
            AccessError::NotAuthorized => {
                AppError::NotAuthorized("Authentication is required".to_string())
            }
            AccessError::Lookup(detail) => AppError::Internal(detail),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, title, detail, source, meta) = match self {
            AppError::Validation {
                detail,
                error_source: source,
            } => {
                tracing::info!("Validation error: {}", detail);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Invalid Query/Body",
                    detail,
                    source,
                    None,
                )
            }
            AppError::NotFound(detail) => {
                tracing::info!("Not found: {}", detail);
                (StatusCode::NOT_FOUND, "Not Found", detail, None, None)
            }
            AppError::PageOutOfBounds { page, last } => {
                tracing::info!(page, last, "Page out of bounds");
                (
                    StatusCode::NOT_FOUND,
                    "Page Out Of Bounds",
                    format!("page {} is out of bounds, last page is {}", page, last),
                    Some(ErrorSource::parameter("page", page.to_string())),
                    Some(serde_json::json!({ "page": page, "last": last })),
                )
            }
            AppError::Forbidden(detail) => {
                tracing::info!("Forbidden: {}", detail);
                (StatusCode::FORBIDDEN, "Forbidden", detail, None, None)
            }
            AppError::NotAuthorized(detail) => {
                tracing::info!("Unauthorized: {}", detail);
                (StatusCode::UNAUTHORIZED, "Unauthorized", detail, None, None)
            }
            AppError::Conflict(detail) => {
                tracing::info!("Conflict: {}", detail);
                (Self::conflict_status(), "Conflict", detail, None, None)
            }
            AppError::UnsupportedMediaType(detail) => {
                tracing::info!("Unsupported media type: {}", detail);
                (
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    "Unsupported Media Type",
                    detail,
                    None,
                    None,
                )
            }
            AppError::Database(e) => map_db_error(e),
            AppError::JsonExtractorRejection(e) => {
                tracing::warn!("JSON extraction error: {:?}", e);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Invalid Query/Body",
                    e.body_text(),
                    None,
                    None,
                )
            }
            AppError::ValidationErrors(e) => {
                tracing::info!("Validation error: {:?}", e);
                return validation_errors_response(&e);
            }
            AppError::UuidError(e) => {
                tracing::warn!("UUID error: {:?}", e);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Invalid Query/Body",
                    format!("invalid UUID: {}", e),
                    Some(ErrorSource {
                        parameter: Some("id".to_string()),
                        ..Default::default()
                    }),
                    None,
                )
            }
            AppError::SerdeJson(e) => {
                tracing::error!("JSON parsing error: {:?}", e);
                internal_error()
            }
            AppError::Io(e) => {
                tracing::error!("I/O error: {:?}", e);
                internal_error()
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal server error: {}", detail);
                internal_error()
            }
        };

        let body = Json(ErrorDocument::single(title, detail, status, source, meta));
        (status, body).into_response()
    }
}

type ErrorParts = (
    StatusCode,
    &'static str,
    String,
    Option<ErrorSource>,
    Option<serde_json::Value>,
);

fn internal_error() -> ErrorParts {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error",
        "An unexpected error occurred".to_string(),
        None,
        None,
    )
}

/// Database errors leak no SQL to clients: constraint violations become 422,
/// missing rows 404, everything else an opaque 500.
fn map_db_error(error: DbErr) -> ErrorParts {
    match error.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::info!("Unique constraint violation: {:?}", error);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid Query/Body",
                "A record with these unique values already exists".to_string(),
                None,
                None,
            )
        }
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
            tracing::info!("Foreign key violation: {:?}", error);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid Query/Body",
                "A referenced record does not exist".to_string(),
                None,
                None,
            )
        }
        _ => match error {
            DbErr::RecordNotFound(detail) => {
                tracing::info!("Record not found: {}", detail);
                (StatusCode::NOT_FOUND, "Not Found", detail, None, None)
            }
            other => {
                tracing::error!("Database error: {:?}", other);
                internal_error()
            }
        },
    }
}

/// One error object per invalid field, with the attribute in `source`.
fn validation_errors_response(errors: &ValidationErrors) -> Response {
    let mut objects = Vec::new();

    for (field, field_errors) in errors.field_errors() {
        for err in field_errors.iter() {
            let detail = err
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("field '{}' failed validation '{}'", field, err.code));

            objects.push(ErrorObject {
                title: "Invalid Query/Body".to_string(),
                detail,
                status: StatusCode::UNPROCESSABLE_ENTITY.as_u16().to_string(),
                source: Some(ErrorSource {
                    attribute: Some(field.to_string()),
                    ..Default::default()
                }),
                meta: None,
            });
        }
    }

    if objects.is_empty() {
        objects.push(ErrorObject {
            title: "Invalid Query/Body".to_string(),
            detail: "Request validation failed".to_string(),
            status: StatusCode::UNPROCESSABLE_ENTITY.as_u16().to_string(),
            source: None,
            meta: None,
        });
    }

    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ErrorDocument { errors: objects }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_document_shape() {
        let response = AppError::NotFound("product not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        let error = &json["errors"][0];
        assert_eq!(error["title"], "Not Found");
        assert_eq!(error["detail"], "product not found");
        assert_eq!(error["status"], "404");
        assert!(error.get("source").is_none());
    }

    #[tokio::test]
    async fn test_conflict_uses_419() {
        let response = AppError::Conflict("order already paid".to_string()).into_response();
        assert_eq!(response.status().as_u16(), 419);
    }

    #[tokio::test]
    async fn test_page_out_of_bounds_carries_meta() {
        let response = AppError::PageOutOfBounds { page: 9, last: 3 }.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        let error = &json["errors"][0];
        assert_eq!(error["title"], "Page Out Of Bounds");
        assert_eq!(error["meta"]["last"], 3);
        assert_eq!(error["source"]["parameter"], "page");
    }

    #[tokio::test]
    async fn test_query_error_maps_to_validation() {
        let err = QueryError::UnknownField {
            parameter: "sort".to_string(),
            resource: "product".to_string(),
            value: "secret".to_string(),
        };
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let json = body_json(response).await;
        let error = &json["errors"][0];
        assert_eq!(error["source"]["parameter"], "sort");
        assert_eq!(error["source"]["value"], "secret");
    }

    #[tokio::test]
    async fn test_access_error_forbidden() {
        let response = AppError::from(AccessError::Forbidden).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_internal_hides_detail() {
        let response =
            AppError::Internal("connection pool exploded at 0x7f".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["errors"][0]["detail"], "An unexpected error occurred");
    }
}
