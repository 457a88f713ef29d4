//! Object storage seam.
//!
//! The actual blob store (S3 or compatible) is an external collaborator; the
//! domain only needs put/delete/url. The in-memory implementation backs
//! development and tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{MediaError, MediaResult};

/// Blob storage seam for uploaded objects.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> MediaResult<()>;

    async fn delete(&self, key: &str) -> MediaResult<()>;

    /// Public URL for a stored object.
    fn url(&self, key: &str) -> String;
}

#[derive(Clone)]
struct StoredObject {
    content_type: String,
    bytes: Vec<u8>,
}

/// In-memory implementation of ObjectStore (for development/testing)
#[derive(Clone)]
pub struct InMemoryObjectStore {
    base_url: String,
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

impl InMemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> MediaResult<()> {
        let mut objects = self.objects.write().await;
        objects.insert(
            key.to_string(),
            StoredObject {
                content_type: content_type.to_string(),
                bytes,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> MediaResult<()> {
        let mut objects = self.objects.write().await;
        objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| MediaError::Store(format!("no object at key {key}")))
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{key}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_delete_round_trips() {
        let store = InMemoryObjectStore::new("http://blobs.local");
        store
            .put("a/b.png", "image/png", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.url("a/b.png"), "http://blobs.local/a/b.png");

        store.delete("a/b.png").await.unwrap();
        assert!(store.is_empty().await);
        assert!(store.delete("a/b.png").await.is_err());
    }

    #[tokio::test]
    async fn stored_bytes_keep_their_content_type() {
        let store = InMemoryObjectStore::new("http://blobs.local");
        store
            .put("k", "application/pdf", b"%PDF".to_vec())
            .await
            .unwrap();
        let objects = store.objects.read().await;
        let object = objects.get("k").unwrap();
        assert_eq!(object.content_type, "application/pdf");
        assert_eq!(object.bytes, b"%PDF");
    }
}
