//! Media Domain
//!
//! Uploaded media objects: metadata rows in Postgres plus blobs behind the
//! [`store::ObjectStore`] seam. Uploads are restricted to an allow-list of
//! content types; objects are owner-scoped (`owner_id` ownership).

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use error::{MediaError, MediaResult};
pub use models::{MediaDocument, MediaObject};
pub use postgres::PgMediaRepository;
pub use repository::{InMemoryMediaRepository, MediaRepository};
pub use service::{MediaService, ALLOWED_CONTENT_TYPES};
pub use store::{InMemoryObjectStore, ObjectStore};
