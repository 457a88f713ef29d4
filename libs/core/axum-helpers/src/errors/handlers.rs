use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::ErrorDocument;

/// Handler for 404 Not Found errors.
///
/// This can be used as a fallback handler in your router.
pub async fn not_found() -> Response {
    let body = Json(ErrorDocument::single(
        "Not Found",
        "The requested resource was not found",
        StatusCode::NOT_FOUND,
        None,
        None,
    ));

    (StatusCode::NOT_FOUND, body).into_response()
}

/// Handler for 405 Method Not Allowed errors.
pub async fn method_not_allowed() -> Response {
    let body = Json(ErrorDocument::single(
        "Method Not Allowed",
        "The HTTP method is not allowed for this resource",
        StatusCode::METHOD_NOT_ALLOWED,
        None,
        None,
    ));

    (StatusCode::METHOD_NOT_ALLOWED, body).into_response()
}
