use axum_helpers::AppError;
use thiserror::Error;

pub type UserResult<T> = Result<T, UserError>;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("Role not found")]
    RoleNotFound,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Unknown permission ids: {0:?}")]
    UnknownPermissionIds(Vec<i32>),

    #[error("'{0}' is not a valid permission id")]
    InvalidPermissionId(String),

    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<UserError> for AppError {
    fn from(error: UserError) -> Self {
        match error {
            UserError::NotFound => AppError::NotFound("User not found".to_string()),
            UserError::RoleNotFound => AppError::NotFound("Role not found".to_string()),
            UserError::EmailTaken => AppError::validation("Email is already registered"),
            UserError::InvalidCredentials => {
                AppError::NotAuthorized("Invalid email or password".to_string())
            }
            UserError::UnknownPermissionIds(ids) => {
                AppError::validation(format!("Unknown permission ids: {ids:?}"))
            }
            UserError::InvalidPermissionId(raw) => AppError::validation_with_source(
                format!("'{raw}' is not a valid permission id"),
                query_options::ErrorSource {
                    attribute: Some("permissions_ids".to_string()),
                    value: Some(raw),
                    ..Default::default()
                },
            ),
            UserError::Database(err) => AppError::Database(err),
            UserError::Internal(detail) => AppError::Internal(detail),
        }
    }
}
