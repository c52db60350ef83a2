//! In-process store backed by a hash map.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::ImageStore;
use crate::error::StoreError;
use crate::types::{now_millis, ImageId, ImageRecord, NewImage};

/// Keeps every record in memory; contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<ImageId, ImageRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert(&self, image: NewImage) -> Result<ImageRecord, StoreError> {
        let record = ImageRecord::from_new(ImageId::new(), image, now_millis());
        self.records
            .write()
            .await
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: ImageId) -> Result<Option<ImageRecord>, StoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_then_get() {
        let store = MemoryStore::new();
        let saved = store
            .insert(NewImage::from_canonical("mug.png", vec![1, 2, 3], None))
            .await
            .unwrap();

        let loaded = store.get(saved.id).await.unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(loaded.name, "mug.png");
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_every_insert_gets_a_new_id() {
        let store = MemoryStore::new();
        let a = store
            .insert(NewImage::from_canonical("a.png", vec![1], None))
            .await
            .unwrap();
        let b = store
            .insert(NewImage::from_canonical("a.png", vec![1], None))
            .await
            .unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_id_is_none() {
        let store = MemoryStore::new();
        assert!(store.get(ImageId::new()).await.unwrap().is_none());
    }
}
