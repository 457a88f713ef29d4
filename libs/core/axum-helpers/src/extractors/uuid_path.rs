//! UUID path parameter extractor with automatic validation.

use crate::errors::AppError;
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use query_options::ErrorSource;
use uuid::Uuid;

/// Extractor for UUID path parameters.
///
/// Parses the id path segment as a UUID, rejecting with a 422 error
/// document when it is malformed.
///
/// # Example
/// ```ignore
/// use axum::Router;
/// use axum::routing::get;
/// use axum_helpers::extractors::UuidPath;
///
/// async fn get_product(UuidPath(id): UuidPath) -> String {
///     format!("Product ID: {}", id)
/// }
///
/// let app = Router::new().route("/products/{id}", get(get_product));
/// ```
pub struct UuidPath(pub Uuid);

impl<S> FromRequestParts<S> for UuidPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::validation(e.to_string()))?;

        Uuid::parse_str(&id).map(UuidPath).map_err(|_| {
            AppError::validation_with_source(
                format!("'{}' is not a valid UUID", id),
                ErrorSource::parameter("id", id.clone()),
            )
        })
    }
}
