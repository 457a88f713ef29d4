//! Postgres-backed media repository

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use database::BaseRepository;
use query_options::{QueryDescriptor, SortDirection};

use crate::entity::media_objects;
use crate::error::MediaResult;
use crate::models::{MediaObject, NewMediaObject};
use crate::repository::MediaRepository;

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
pub struct PgMediaRepository {
    base: BaseRepository<media_objects::Entity>,
}

impl PgMediaRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl MediaRepository for PgMediaRepository {
    async fn create(&self, input: NewMediaObject) -> MediaResult<MediaObject> {
        let active: media_objects::ActiveModel = input.into();
        Ok(self.base.insert(active).await?.into())
    }

    async fn get_by_id(&self, id: Uuid) -> MediaResult<Option<MediaObject>> {
        Ok(self.base.find_by_id(id).await?.map(Into::into))
    }

    async fn list(&self, descriptor: &QueryDescriptor) -> MediaResult<(Vec<MediaObject>, u64)> {
        let mut query = media_objects::Entity::find();
        for (field, value) in &descriptor.filter {
            if let Ok(column) = field.parse::<media_objects::Column>() {
                query = query.filter(column.eq(filter_value(value)));
            }
        }
        let total = query.clone().count(self.base.db()).await?;
        for (field, direction) in &descriptor.order {
            if let Ok(column) = field.parse::<media_objects::Column>() {
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

    async fn delete(&self, id: Uuid) -> MediaResult<bool> {
        Ok(self.base.delete_by_id(id).await?)
    }
}
