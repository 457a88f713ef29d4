use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use query_options::{apply_descriptor, QueryDescriptor};

use crate::error::{MediaError, MediaResult};
use crate::models::{MediaObject, NewMediaObject};

/// Repository trait for media object metadata
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaRepository: Send + Sync {
    async fn create(&self, input: NewMediaObject) -> MediaResult<MediaObject>;

    async fn get_by_id(&self, id: Uuid) -> MediaResult<Option<MediaObject>>;

    /// List media objects honoring the request's query descriptor, returning
    /// the page plus the filtered total
    async fn list(&self, descriptor: &QueryDescriptor) -> MediaResult<(Vec<MediaObject>, u64)>;

    async fn delete(&self, id: Uuid) -> MediaResult<bool>;
}

/// In-memory implementation of MediaRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryMediaRepository {
    objects: Arc<RwLock<HashMap<Uuid, MediaObject>>>,
}

impl InMemoryMediaRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MediaRepository for InMemoryMediaRepository {
    async fn create(&self, input: NewMediaObject) -> MediaResult<MediaObject> {
        let mut objects = self.objects.write().await;
        let object = MediaObject {
            id: Uuid::now_v7(),
            owner_id: input.owner_id,
            object_key: input.object_key,
            content_type: input.content_type,
            byte_size: input.byte_size,
            created_at: chrono::Utc::now().into(),
        };
        objects.insert(object.id, object.clone());
        tracing::info!(media_id = %object.id, key = %object.object_key, "Created media object");
        Ok(object)
    }

    async fn get_by_id(&self, id: Uuid) -> MediaResult<Option<MediaObject>> {
        let objects = self.objects.read().await;
        Ok(objects.get(&id).cloned())
    }

    async fn list(&self, descriptor: &QueryDescriptor) -> MediaResult<(Vec<MediaObject>, u64)> {
        let objects = self.objects.read().await;
        let values = objects
            .values()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| MediaError::Internal(e.to_string()))?;
        let (page, total) = apply_descriptor(values, descriptor);
        let page = page
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<MediaObject>, _>>()
            .map_err(|e| MediaError::Internal(e.to_string()))?;
        Ok((page, total))
    }

    async fn delete(&self, id: Uuid) -> MediaResult<bool> {
        let mut objects = self.objects.write().await;
        Ok(objects.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_filters_by_owner() {
        let repo = InMemoryMediaRepository::new();
        let owner = Uuid::now_v7();
        for n in 0..2 {
            repo.create(NewMediaObject {
                owner_id: owner,
                object_key: format!("{owner}/{n}.png"),
                content_type: "image/png".to_string(),
                byte_size: 3,
            })
            .await
            .unwrap();
        }
        repo.create(NewMediaObject {
            owner_id: Uuid::now_v7(),
            object_key: "other/file.png".to_string(),
            content_type: "image/png".to_string(),
            byte_size: 3,
        })
        .await
        .unwrap();

        let mut descriptor = QueryDescriptor::default();
        descriptor
            .filter
            .push(("owner_id".to_string(), owner.to_string()));
        let (page, total) = repo.list(&descriptor).await.unwrap();
        assert_eq!(total, 2);
        assert!(page.iter().all(|o| o.owner_id == owner));
    }
}
