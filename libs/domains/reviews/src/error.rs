use axum_helpers::AppError;
use thiserror::Error;

pub type ReviewResult<T> = Result<T, ReviewError>;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Review not found")]
    NotFound,

    #[error("Product not found")]
    ProductNotFound,

    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ReviewError> for AppError {
    fn from(error: ReviewError) -> Self {
        match error {
            ReviewError::NotFound => AppError::NotFound("Review not found".to_string()),
            ReviewError::ProductNotFound => AppError::NotFound("Product not found".to_string()),
            ReviewError::Database(err) => AppError::Database(err),
            ReviewError::Internal(detail) => AppError::Internal(detail),
        }
    }
}
