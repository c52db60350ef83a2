//! Upload and beautify orchestration.
//!
//! ```text
//! submit:   bytes → Normalize → Store                      → id
//! beautify: id → Load → Normalize → Image-edit API → Normalize → Store → id, preview
//! ```
//!
//! A record moves from *received* to *stored* on submit. Beautify either
//! produces a new derived record or fails without writing anything, so a
//! failed beautify can simply be called again with the same id.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{LimitsConfig, TransformConfig};
use crate::error::{PipelineError, PipelineResult, UpstreamError};
use crate::normalize::Normalizer;
use crate::store::ImageStore;
use crate::transform::{EditRequest, ImageEditor};
use crate::types::{now_millis, BeautifyOutcome, ImageId, ImageRecord, NewImage};

/// Composes the normalizer, the image-edit provider and the store.
pub struct Pipeline {
    store: Arc<dyn ImageStore>,
    editor: Arc<dyn ImageEditor>,
    normalizer: Normalizer,
    prompt: String,
    size: String,
}

impl Pipeline {
    /// Create a pipeline from its collaborators and settings.
    pub fn new(
        store: Arc<dyn ImageStore>,
        editor: Arc<dyn ImageEditor>,
        limits: LimitsConfig,
        transform: &TransformConfig,
    ) -> Self {
        Self {
            store,
            editor,
            normalizer: Normalizer::new(limits),
            prompt: transform.prompt.clone(),
            size: transform.size.clone(),
        }
    }

    /// Normalize and persist an uploaded file, returning the new record's id.
    pub async fn submit(&self, file_name: &str, bytes: Vec<u8>) -> PipelineResult<ImageId> {
        if bytes.is_empty() {
            return Err(PipelineError::Validation("No file uploaded".to_string()));
        }

        let canonical = self.normalizer.normalize(bytes, file_name).await?;
        let saved = self
            .store
            .insert(NewImage::from_canonical(file_name, canonical.png, None))
            .await?;

        tracing::info!(id = %saved.id, name = %saved.name, "Image uploaded");
        Ok(saved.id)
    }

    /// Send a stored image to the image-edit API and persist the result as a new record.
    ///
    /// The source record is never modified. Concurrent calls for the same id
    /// each produce their own derived record.
    pub async fn beautify(&self, id: ImageId) -> PipelineResult<BeautifyOutcome> {
        let source = self.fetch(id).await?;
        tracing::info!(id = %source.id, name = %source.name, "Beautifying image");

        // Stored bytes should already be canonical; re-normalizing tolerates
        // records written by older versions.
        let canonical = self
            .normalizer
            .normalize(source.img.data.clone(), &source.name)
            .await?;
        let request = EditRequest::new(canonical.png, &source.name, &self.prompt, &self.size);

        let response = match tokio::time::timeout(
            self.editor.timeout() + Duration::from_secs(1),
            self.editor.edit(&request),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(UpstreamError::Timeout {
                    timeout_ms: self.editor.timeout().as_millis() as u64,
                }
                .into())
            }
        };
        tracing::debug!(
            provider = self.editor.name(),
            latency_ms = response.latency_ms,
            bytes = response.image.len(),
            "Image-edit call returned"
        );

        let name = format!("beautified_{}.png", now_millis());
        let result = self.normalizer.normalize(response.image, &name).await?;
        let saved = self
            .store
            .insert(NewImage::from_canonical(name, result.png, Some(source.id)))
            .await?;

        tracing::info!(source = %source.id, id = %saved.id, "Beautification completed");
        Ok(BeautifyOutcome {
            id: saved.id,
            preview: saved.preview,
        })
    }

    /// Load a record, failing with `NotFound` if it does not exist.
    pub async fn fetch(&self, id: ImageId) -> PipelineResult<ImageRecord> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(id.to_string()))
    }

    /// The store this pipeline writes to.
    pub fn store(&self) -> &Arc<dyn ImageStore> {
        &self.store
    }
}
