//! Postgres-backed review repository

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr,
};
use uuid::Uuid;

use database::BaseRepository;
use query_options::{QueryDescriptor, SortDirection};

use crate::entity::reviews;
use crate::error::{ReviewError, ReviewResult};
use crate::models::{NewReview, Review, UpdateReview};
use crate::repository::ReviewRepository;

fn filter_value(raw: &str) -> sea_orm::Value {
    if let Ok(id) = Uuid::parse_str(raw) {
        return id.into();
    }
    if let Ok(n) = raw.parse::<i64>() {
        return n.into();
    }
    raw.into()
}

#[derive(Clone)]
pub struct PgReviewRepository {
    base: BaseRepository<reviews::Entity>,
}

impl PgReviewRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    async fn create(&self, input: NewReview) -> ReviewResult<Review> {
        let active: reviews::ActiveModel = input.into();
        // The product_id foreign key is the only reference a client controls.
        let model = self.base.insert(active).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_))) {
                ReviewError::ProductNotFound
            } else {
                ReviewError::Database(e)
            }
        })?;
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> ReviewResult<Option<Review>> {
        Ok(self.base.find_by_id(id).await?.map(Into::into))
    }

    async fn list(&self, descriptor: &QueryDescriptor) -> ReviewResult<(Vec<Review>, u64)> {
        let mut query = reviews::Entity::find();
        for (field, value) in &descriptor.filter {
            if let Ok(column) = field.parse::<reviews::Column>() {
                query = query.filter(column.eq(filter_value(value)));
            }
        }
        let total = query.clone().count(self.base.db()).await?;
        for (field, direction) in &descriptor.order {
            if let Ok(column) = field.parse::<reviews::Column>() {
                query = match direction {
                    SortDirection::Asc => query.order_by_asc(column),
                    SortDirection::Desc => query.order_by_desc(column),
                };
            }
        }
        let models = query
            .offset(descriptor.offset)
            .limit(descriptor.limit)
            .all(self.base.db())
            .await?;
        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    async fn update(&self, id: Uuid, input: UpdateReview) -> ReviewResult<Review> {
        let model = self
            .base
            .find_by_id(id)
            .await?
            .ok_or(ReviewError::NotFound)?;
        let mut active = model.into_active_model();
        if let Some(rating) = input.rating {
            active.rating = Set(rating);
        }
        if let Some(comment) = input.comment {
            active.comment = Set(comment);
        }
        Ok(self.base.update(active).await?.into())
    }

    async fn delete(&self, id: Uuid) -> ReviewResult<bool> {
        Ok(self.base.delete_by_id(id).await?)
    }
}
