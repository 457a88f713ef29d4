use axum_helpers::AppError;
use thiserror::Error;
use uuid::Uuid;

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Category not found")]
    CategoryNotFound,

    #[error("Supplier not found")]
    SupplierNotFound,

    #[error("Category slug is already in use")]
    SlugTaken,

    #[error("Supplier email is already registered")]
    SupplierEmailTaken,

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CatalogError> for AppError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::ProductNotFound => AppError::NotFound("Product not found".to_string()),
            CatalogError::CategoryNotFound => AppError::NotFound("Category not found".to_string()),
            CatalogError::SupplierNotFound => AppError::NotFound("Supplier not found".to_string()),
            CatalogError::SlugTaken => AppError::validation("Category slug is already in use"),
            CatalogError::SupplierEmailTaken => {
                AppError::validation("Supplier email is already registered")
            }
            CatalogError::InsufficientStock {
                product_id,
                requested,
                available,
            } => AppError::validation(format!(
                "Insufficient stock for product {product_id}: requested {requested}, available {available}"
            )),
            CatalogError::Database(err) => AppError::Database(err),
            CatalogError::Internal(detail) => AppError::Internal(detail),
        }
    }
}
