//! Object store for image records.
//!
//! The store is append-only: records can be inserted and read, never updated
//! or deleted. Two backends are provided: [`MemoryStore`] for tests and
//! throwaway runs, and [`SqliteStore`] for a persistent single-file database.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{Config, StoreBackend};
use crate::error::StoreError;
use crate::types::{ImageId, ImageRecord, NewImage};

/// Persistence interface used by the pipeline.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Persist a new record, assigning it a fresh id.
    async fn insert(&self, image: NewImage) -> Result<ImageRecord, StoreError>;

    /// Load a record by id.
    async fn get(&self, id: ImageId) -> Result<Option<ImageRecord>, StoreError>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize, StoreError>;
}

/// Open the store selected by `config.store`.
pub fn open_store(config: &Config) -> Result<Arc<dyn ImageStore>, StoreError> {
    match config.store.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Sqlite => Ok(Arc::new(SqliteStore::open(&config.store_path())?)),
    }
}
