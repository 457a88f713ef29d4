//! Review service

use std::sync::Arc;

use uuid::Uuid;

use query_options::QueryDescriptor;

use crate::error::{ReviewError, ReviewResult};
use crate::models::{CreateReview, NewReview, Review, UpdateReview};
use crate::repository::ReviewRepository;

/// Service layer for review operations
#[derive(Clone)]
pub struct ReviewService<R> {
    repository: Arc<R>,
}

impl<R: ReviewRepository> ReviewService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn create(&self, user_id: Uuid, input: CreateReview) -> ReviewResult<Review> {
        self.repository
            .create(NewReview {
                user_id,
                product_id: input.product_id,
                rating: input.rating,
                comment: input.comment,
            })
            .await
    }

    pub async fn get(&self, id: Uuid) -> ReviewResult<Review> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(ReviewError::NotFound)
    }

    pub async fn list(&self, descriptor: &QueryDescriptor) -> ReviewResult<(Vec<Review>, u64)> {
        self.repository.list(descriptor).await
    }

    pub async fn update(&self, id: Uuid, input: UpdateReview) -> ReviewResult<Review> {
        self.repository.update(id, input).await
    }

    pub async fn delete(&self, id: Uuid) -> ReviewResult<bool> {
        self.repository.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockReviewRepository;

    #[tokio::test]
    async fn create_stamps_the_author() {
        let author = Uuid::now_v7();
        let product = Uuid::now_v7();

        let mut repo = MockReviewRepository::new();
        repo.expect_create()
            .withf(move |input: &NewReview| input.user_id == author && input.rating == 4)
            .returning(|input| {
                Ok(Review {
                    id: Uuid::now_v7(),
                    user_id: input.user_id,
                    product_id: input.product_id,
                    rating: input.rating,
                    comment: input.comment,
                    created_at: chrono::Utc::now().into(),
                })
            });

        let service = ReviewService::new(Arc::new(repo));
        let review = service
            .create(
                author,
                CreateReview {
                    product_id: product,
                    rating: 4,
                    comment: "good".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(review.user_id, author);
    }

    #[tokio::test]
    async fn get_maps_missing_review_to_not_found() {
        let mut repo = MockReviewRepository::new();
        repo.expect_get_by_id().returning(|_| Ok(None));

        let service = ReviewService::new(Arc::new(repo));
        let result = service.get(Uuid::now_v7()).await;
        assert!(matches!(result, Err(ReviewError::NotFound)));
    }
}
