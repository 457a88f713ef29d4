//! Catalog Domain
//!
//! Products, categories and supplier profiles. Reads are public; product
//! mutation is supplier-owned (`supplier_id` ownership) and category
//! administration requires elevated permissions. Stock accounting lives here
//! too: order placement decrements stock all-or-nothing and cancellation
//! restores it.

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use error::{CatalogError, CatalogResult};
pub use models::{
    Category, CreateCategory, CreateProduct, CreateSupplier, Product, Supplier, UpdateCategory,
    UpdateProduct, UpdateSupplier,
};
pub use postgres::{PgCategoryRepository, PgProductRepository, PgSupplierRepository};
pub use repository::{
    CategoryRepository, InMemoryCategoryRepository, InMemoryProductRepository,
    InMemorySupplierRepository, ProductRepository, SupplierRepository,
};
pub use service::CatalogService;
