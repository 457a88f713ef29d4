use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use query_options::{apply_descriptor, QueryDescriptor};

use crate::error::{ReviewError, ReviewResult};
use crate::models::{NewReview, Review, UpdateReview};

/// Repository trait for review persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn create(&self, input: NewReview) -> ReviewResult<Review>;

    async fn get_by_id(&self, id: Uuid) -> ReviewResult<Option<Review>>;

    /// List reviews honoring the request's query descriptor, returning the
    /// page plus the filtered total
    async fn list(&self, descriptor: &QueryDescriptor) -> ReviewResult<(Vec<Review>, u64)>;

    async fn update(&self, id: Uuid, input: UpdateReview) -> ReviewResult<Review>;

    async fn delete(&self, id: Uuid) -> ReviewResult<bool>;
}

/// In-memory implementation of ReviewRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryReviewRepository {
    reviews: Arc<RwLock<HashMap<Uuid, Review>>>,
}

impl InMemoryReviewRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewRepository for InMemoryReviewRepository {
    async fn create(&self, input: NewReview) -> ReviewResult<Review> {
        let mut reviews = self.reviews.write().await;
        let review = Review {
            id: Uuid::now_v7(),
            user_id: input.user_id,
            product_id: input.product_id,
            rating: input.rating,
            comment: input.comment,
            created_at: chrono::Utc::now().into(),
        };
        reviews.insert(review.id, review.clone());
        tracing::info!(review_id = %review.id, product_id = %review.product_id, "Created review");
        Ok(review)
    }

    async fn get_by_id(&self, id: Uuid) -> ReviewResult<Option<Review>> {
        let reviews = self.reviews.read().await;
        Ok(reviews.get(&id).cloned())
    }

    async fn list(&self, descriptor: &QueryDescriptor) -> ReviewResult<(Vec<Review>, u64)> {
        let reviews = self.reviews.read().await;
        let values = reviews
            .values()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ReviewError::Internal(e.to_string()))?;
        let (page, total) = apply_descriptor(values, descriptor);
        let page = page
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Review>, _>>()
            .map_err(|e| ReviewError::Internal(e.to_string()))?;
        Ok((page, total))
    }

    async fn update(&self, id: Uuid, input: UpdateReview) -> ReviewResult<Review> {
        let mut reviews = self.reviews.write().await;
        let review = reviews.get_mut(&id).ok_or(ReviewError::NotFound)?;
        if let Some(rating) = input.rating {
            review.rating = rating;
        }
        if let Some(comment) = input.comment {
            review.comment = comment;
        }
        Ok(review.clone())
    }

    async fn delete(&self, id: Uuid) -> ReviewResult<bool> {
        let mut reviews = self.reviews.write().await;
        Ok(reviews.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_review(product_id: Uuid, rating: i32) -> NewReview {
        NewReview {
            user_id: Uuid::now_v7(),
            product_id,
            rating,
            comment: "solid".to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_update_review() {
        let repo = InMemoryReviewRepository::new();
        let review = repo.create(new_review(Uuid::now_v7(), 4)).await.unwrap();

        let updated = repo
            .update(
                review.id,
                UpdateReview {
                    rating: Some(2),
                    comment: Some("changed my mind".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.rating, 2);
        assert_eq!(updated.comment, "changed my mind");
    }

    #[tokio::test]
    async fn list_filters_by_product() {
        let repo = InMemoryReviewRepository::new();
        let product = Uuid::now_v7();
        repo.create(new_review(product, 5)).await.unwrap();
        repo.create(new_review(product, 3)).await.unwrap();
        repo.create(new_review(Uuid::now_v7(), 1)).await.unwrap();

        let mut descriptor = QueryDescriptor::default();
        descriptor
            .filter
            .push(("product_id".to_string(), product.to_string()));
        let (page, total) = repo.list(&descriptor).await.unwrap();
        assert_eq!(total, 2);
        assert!(page.iter().all(|r| r.product_id == product));
    }

    #[tokio::test]
    async fn delete_missing_review_returns_false() {
        let repo = InMemoryReviewRepository::new();
        assert!(!repo.delete(Uuid::now_v7()).await.unwrap());
    }
}
