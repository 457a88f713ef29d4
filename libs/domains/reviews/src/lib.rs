//! Reviews Domain
//!
//! Product reviews with a 1-5 rating. Reads are public; creation requires an
//! authenticated account and updates/deletes are author-owned (`user_id`
//! ownership).

pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use error::{ReviewError, ReviewResult};
pub use models::{CreateReview, Review, UpdateReview};
pub use postgres::PgReviewRepository;
pub use repository::{InMemoryReviewRepository, ReviewRepository};
pub use service::ReviewService;
