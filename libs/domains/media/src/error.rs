use axum_helpers::AppError;
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Media object not found")]
    NotFound,

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Object store error: {0}")]
    Store(String),

    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<MediaError> for AppError {
    fn from(error: MediaError) -> Self {
        match error {
            MediaError::NotFound => AppError::NotFound("Media object not found".to_string()),
            MediaError::UnsupportedMediaType(content_type) => {
                AppError::UnsupportedMediaType(content_type)
            }
            MediaError::Store(detail) => {
                AppError::Internal(format!("Object store error: {detail}"))
            }
            MediaError::Database(err) => AppError::Database(err),
            MediaError::Internal(detail) => AppError::Internal(detail),
        }
    }
}
