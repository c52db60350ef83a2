//! SQLite-backed store.
//!
//! One row per record in an `images` table. The connection lives behind a
//! mutex and every query runs on the blocking pool so handlers never stall
//! the async runtime.

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::ImageStore;
use crate::error::StoreError;
use crate::types::{now_millis, ImageId, ImageRecord, NewImage, StoredImage};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS images (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    data            BLOB NOT NULL,
    content_type    TEXT NOT NULL,
    preview         TEXT NOT NULL,
    content_hash    TEXT NOT NULL,
    derived_from    TEXT,
    created_at_ms   INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_images_derived_from ON images(derived_from);
";

/// Persistent store in a single SQLite file.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

/// Column values as read, before ids are validated.
struct RawRow {
    id: String,
    name: String,
    data: Vec<u8>,
    content_type: String,
    preview: String,
    content_hash: String,
    derived_from: Option<String>,
    created_at_ms: i64,
}

impl RawRow {
    fn into_record(self) -> Result<ImageRecord, StoreError> {
        let corrupt = |message: &str| StoreError::Corrupt {
            id: self.id.clone(),
            message: message.to_string(),
        };
        let id = ImageId::parse(&self.id).ok_or_else(|| corrupt("id is not a uuid"))?;
        let derived_from = match &self.derived_from {
            Some(raw) => {
                Some(ImageId::parse(raw).ok_or_else(|| corrupt("derived_from is not a uuid"))?)
            }
            None => None,
        };
        Ok(ImageRecord {
            id,
            name: self.name,
            img: StoredImage {
                data: self.data,
                content_type: self.content_type,
            },
            preview: self.preview,
            content_hash: self.content_hash,
            derived_from,
            created_at_ms: self.created_at_ms.max(0) as u64,
        })
    }
}

impl SqliteStore {
    /// Open or create the database at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        tracing::info!("Image store opened at {}", path.display());
        Self::with_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Join("connection lock poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

#[async_trait]
impl ImageStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn insert(&self, image: NewImage) -> Result<ImageRecord, StoreError> {
        let record = ImageRecord::from_new(ImageId::new(), image, now_millis());
        let row = record.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO images
                    (id, name, data, content_type, preview, content_hash, derived_from, created_at_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    row.id.to_string(),
                    row.name,
                    row.img.data,
                    row.img.content_type,
                    row.preview,
                    row.content_hash,
                    row.derived_from.map(|id| id.to_string()),
                    row.created_at_ms as i64,
                ],
            )?;
            Ok(())
        })
        .await?;
        Ok(record)
    }

    async fn get(&self, id: ImageId) -> Result<Option<ImageRecord>, StoreError> {
        self.run(move |conn| {
            let raw = conn
                .query_row(
                    "SELECT id, name, data, content_type, preview, content_hash, derived_from, created_at_ms
                     FROM images WHERE id = ?1",
                    [id.to_string()],
                    |row| {
                        Ok(RawRow {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            data: row.get(2)?,
                            content_type: row.get(3)?,
                            preview: row.get(4)?,
                            content_hash: row.get(5)?,
                            derived_from: row.get(6)?,
                            created_at_ms: row.get(7)?,
                        })
                    },
                )
                .optional()?;
            raw.map(RawRow::into_record).transpose()
        })
        .await
    }

    async fn count(&self) -> Result<usize, StoreError> {
        self.run(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
            Ok(count.max(0) as usize)
        })
        .await
    }
}
