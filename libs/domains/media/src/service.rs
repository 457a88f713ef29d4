//! Media service: upload validation and object lifecycle.

use std::sync::Arc;

use uuid::Uuid;

use query_options::QueryDescriptor;

use crate::error::{MediaError, MediaResult};
use crate::models::{MediaDocument, MediaObject, NewMediaObject};
use crate::repository::MediaRepository;
use crate::store::ObjectStore;

/// Content types accepted for upload.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/gif",
    "application/pdf",
];

/// Service layer for media operations
#[derive(Clone)]
pub struct MediaService<R, S> {
    repository: Arc<R>,
    store: Arc<S>,
}

impl<R: MediaRepository, S: ObjectStore> MediaService<R, S> {
    pub fn new(repository: Arc<R>, store: Arc<S>) -> Self {
        Self { repository, store }
    }

    /// Store an uploaded blob and record its metadata. The blob lands in the
    /// object store before the row exists; a failed insert removes it again.
    pub async fn upload(
        &self,
        owner_id: Uuid,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> MediaResult<MediaDocument> {
        if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
            return Err(MediaError::UnsupportedMediaType(content_type.to_string()));
        }

        let object_key = format!("{owner_id}/{}-{file_name}", Uuid::now_v7());
        let byte_size = bytes.len() as i64;
        self.store.put(&object_key, content_type, bytes).await?;

        let created = self
            .repository
            .create(NewMediaObject {
                owner_id,
                object_key: object_key.clone(),
                content_type: content_type.to_string(),
                byte_size,
            })
            .await;
        let object = match created {
            Ok(object) => object,
            Err(err) => {
                if let Err(cleanup) = self.store.delete(&object_key).await {
                    tracing::warn!(key = %object_key, error = %cleanup, "Orphaned object after failed insert");
                }
                return Err(err);
            }
        };

        let url = self.store.url(&object.object_key);
        Ok(MediaDocument { object, url })
    }

    pub async fn get(&self, id: Uuid) -> MediaResult<MediaDocument> {
        let object = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(MediaError::NotFound)?;
        let url = self.store.url(&object.object_key);
        Ok(MediaDocument { object, url })
    }

    pub async fn list(&self, descriptor: &QueryDescriptor) -> MediaResult<(Vec<MediaObject>, u64)> {
        self.repository.list(descriptor).await
    }

    /// Delete the metadata row, then the blob. A store failure after the row
    /// is gone is logged, not surfaced.
    pub async fn remove(&self, id: Uuid) -> MediaResult<MediaObject> {
        let object = self
            .repository
            .get_by_id(id)
            .await?
            .ok_or(MediaError::NotFound)?;
        if !self.repository.delete(id).await? {
            return Err(MediaError::NotFound);
        }
        if let Err(err) = self.store.delete(&object.object_key).await {
            tracing::warn!(key = %object.object_key, error = %err, "Blob removal failed after row delete");
        }
        Ok(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryMediaRepository;
    use crate::store::{InMemoryObjectStore, MockObjectStore};

    fn service_with_memory_store() -> MediaService<InMemoryMediaRepository, InMemoryObjectStore> {
        MediaService::new(
            Arc::new(InMemoryMediaRepository::new()),
            Arc::new(InMemoryObjectStore::new("http://blobs.local")),
        )
    }

    #[tokio::test]
    async fn upload_records_metadata_and_stores_the_blob() {
        let service = service_with_memory_store();
        let owner = Uuid::now_v7();

        let doc = service
            .upload(owner, "avatar.png", "image/png", vec![0u8; 42])
            .await
            .unwrap();
        assert_eq!(doc.object.owner_id, owner);
        assert_eq!(doc.object.byte_size, 42);
        assert!(doc.object.object_key.ends_with("-avatar.png"));
        assert_eq!(
            doc.url,
            format!("http://blobs.local/{}", doc.object.object_key)
        );
    }

    #[tokio::test]
    async fn upload_rejects_disallowed_content_types_before_storing() {
        let mut store = MockObjectStore::new();
        store.expect_put().never();
        let service = MediaService::new(Arc::new(InMemoryMediaRepository::new()), Arc::new(store));

        let result = service
            .upload(Uuid::now_v7(), "payload.sh", "text/x-shellscript", vec![])
            .await;
        assert!(matches!(result, Err(MediaError::UnsupportedMediaType(t)) if t == "text/x-shellscript"));
    }

    #[tokio::test]
    async fn remove_deletes_row_and_blob() {
        let repo = Arc::new(InMemoryMediaRepository::new());
        let store = Arc::new(InMemoryObjectStore::new("http://blobs.local"));
        let service = MediaService::new(repo, store.clone());

        let doc = service
            .upload(Uuid::now_v7(), "doc.pdf", "application/pdf", b"%PDF".to_vec())
            .await
            .unwrap();
        assert_eq!(store.len().await, 1);

        service.remove(doc.object.id).await.unwrap();
        assert!(store.is_empty().await);
        assert!(matches!(
            service.get(doc.object.id).await,
            Err(MediaError::NotFound)
        ));
    }
}
