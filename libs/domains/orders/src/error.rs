use axum_helpers::AppError;
use domain_catalog::CatalogError;
use thiserror::Error;

use crate::models::OrderStatus;

pub type OrderResult<T> = Result<T, OrderError>;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order not found")]
    NotFound,

    #[error("Order is {status}, cannot {action}")]
    InvalidState {
        status: OrderStatus,
        action: &'static str,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<OrderError> for AppError {
    fn from(error: OrderError) -> Self {
        match error {
            OrderError::NotFound => AppError::NotFound("Order not found".to_string()),
            OrderError::InvalidState { status, action } => {
                AppError::Conflict(format!("Order is {status}, cannot {action}"))
            }
            OrderError::Catalog(err) => err.into(),
            OrderError::Gateway(detail) => {
                AppError::Internal(format!("Payment gateway error: {detail}"))
            }
            OrderError::Database(err) => AppError::Database(err),
            OrderError::Internal(detail) => AppError::Internal(detail),
        }
    }
}
