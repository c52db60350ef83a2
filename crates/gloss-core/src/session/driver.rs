//! Runs images through upload and beautify against a [`Backend`].
//!
//! Every state change goes through [`Session::apply`]; the driver only adds
//! the network calls, the progress ticker and the notices around it.
//! Observers receive [`SessionSignal`]s on an unbounded channel.

use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use super::state::{ImageStatus, LocalFile, LocalId, Session, SessionEvent, UploadedImage};
use super::ticker::{ProgressTicker, TickerSettings};
use crate::api::{BeautifyResponse, UploadResponse};
use crate::config::ClientConfig;
use crate::error::{ClientError, SessionError};
use crate::normalize::PreviewGenerator;
use crate::types::ImageId;

/// The server operations the session needs.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Upload one file; the server answers with the stored id.
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadResponse, ClientError>;

    /// Ask the server to beautify a stored image.
    async fn beautify(&self, id: ImageId) -> Result<BeautifyResponse, ClientError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// A user-facing message about one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub local_id: LocalId,
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

/// Updates emitted while the session changes.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionSignal {
    Status { local_id: LocalId, status: ImageStatus },
    Progress { local_id: LocalId, progress: f32 },
    Notice(Notice),
    Removed { local_id: LocalId },
}

/// Owns the session and drives images through it.
///
/// Cloning is cheap; clones share the same session and signal channel, so
/// each image can be processed on its own task.
#[derive(Clone)]
pub struct SessionDriver {
    session: Arc<Mutex<Session>>,
    backend: Arc<dyn Backend>,
    signals: mpsc::UnboundedSender<SessionSignal>,
    ticker: TickerSettings,
    preview_size: u32,
}

impl SessionDriver {
    /// Create a driver and the receiving end of its signal channel.
    pub fn new(
        backend: Arc<dyn Backend>,
        config: &ClientConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let driver = Self {
            session: Arc::new(Mutex::new(Session::new())),
            backend,
            signals: tx,
            ticker: TickerSettings::from(config),
            preview_size: config.preview_size,
        };
        (driver, rx)
    }

    /// Add a local file to the session with a small thumbnail preview.
    pub async fn add_file(&self, path: &Path) -> Result<LocalId, ClientError> {
        let file_error = |e: std::io::Error| ClientError::File {
            path: path.display().to_string(),
            message: e.to_string(),
        };
        let bytes = tokio::fs::read(path).await.map_err(file_error)?;
        let file = LocalFile::new(path, bytes.len() as u64);

        let size = self.preview_size;
        let preview = tokio::task::spawn_blocking(move || {
            PreviewGenerator::new(size).generate_from_bytes(&bytes)
        })
        .await
        .unwrap_or(None);

        let name = file.name.clone();
        let id = lock(&self.session).add(file, preview);
        tracing::debug!(local_id = %id, name = %name, "Added image to session");
        self.notify(
            id,
            "Image added",
            format!("{name} is ready for enhancement"),
            Severity::Info,
        );
        Ok(id)
    }

    /// Current state of one image.
    pub fn snapshot(&self, id: LocalId) -> Result<UploadedImage, SessionError> {
        lock(&self.session)
            .get(id)
            .cloned()
            .ok_or(SessionError::UnknownImage(id))
    }

    /// Current state of every image, in insertion order.
    pub fn images(&self) -> Vec<UploadedImage> {
        lock(&self.session).images().to_vec()
    }

    /// Upload an image, moving it to `Submitted` on success or back to `Added`.
    pub async fn submit(&self, id: LocalId) -> Result<ImageId, SessionError> {
        let file = self.snapshot(id)?.file;
        self.transition(id, SessionEvent::SubmitStarted)?;

        let result = match tokio::fs::read(&file.path).await {
            Ok(bytes) => self.backend.upload(&file.name, bytes).await,
            Err(e) => Err(ClientError::File {
                path: file.path.display().to_string(),
                message: e.to_string(),
            }),
        };

        match result {
            Ok(resp) => {
                self.transition(id, SessionEvent::SubmitSucceeded(resp.id))?;
                let description = if resp.message.is_empty() {
                    "Image is ready for beautification".to_string()
                } else {
                    resp.message
                };
                self.notify(id, "Image uploaded successfully!", description, Severity::Success);
                Ok(resp.id)
            }
            Err(e) => {
                tracing::warn!(local_id = %id, error = %e, "Upload failed");
                let _ = self.transition(id, SessionEvent::SubmitFailed);
                self.notify(
                    id,
                    "Upload failed",
                    "Failed to upload image to server",
                    Severity::Error,
                );
                Err(e.into())
            }
        }
    }

    /// Beautify a submitted image, returning the enhanced previews.
    ///
    /// Progress advances cosmetically while the call is in flight. On failure
    /// the image goes back to `Submitted` and can be beautified again.
    pub async fn beautify(&self, id: LocalId) -> Result<Vec<String>, SessionError> {
        let Some(server_id) = self.snapshot(id)?.server_id else {
            self.notify(
                id,
                "Please submit image first",
                "Image must be uploaded before beautification",
                Severity::Error,
            );
            return Err(SessionError::NotSubmitted(id));
        };
        self.transition(id, SessionEvent::BeautifyStarted)?;

        let ticker = self.spawn_ticker(id);
        let result = self
            .backend
            .beautify(server_id)
            .await
            .and_then(|resp| resp.image.ok_or(ClientError::MissingPreview));
        ticker.stop().await;

        match result {
            Ok(preview) => {
                let enhanced = vec![preview];
                self.transition(id, SessionEvent::BeautifySucceeded(enhanced.clone()))?;
                self.notify(
                    id,
                    "Enhancement completed!",
                    format!("Generated {} enhanced image", enhanced.len()),
                    Severity::Success,
                );
                Ok(enhanced)
            }
            Err(e) => {
                tracing::warn!(local_id = %id, error = %e, "Beautify failed");
                let _ = self.transition(id, SessionEvent::BeautifyFailed);
                self.notify(id, "Enhancement failed", e.to_string(), Severity::Error);
                Err(e.into())
            }
        }
    }

    /// Submit and, if asked, beautify one image.
    pub async fn process(&self, id: LocalId, beautify: bool) -> Result<UploadedImage, SessionError> {
        self.submit(id).await?;
        if beautify {
            self.beautify(id).await?;
        }
        self.snapshot(id)
    }

    /// Remove an image in any state. No server call is made.
    pub fn remove(&self, id: LocalId) -> bool {
        let removed = lock(&self.session).remove(id);
        match removed {
            Some(image) => {
                tracing::debug!(local_id = %id, status = %image.status, "Removed image from session");
                let _ = self.signals.send(SessionSignal::Removed { local_id: id });
                true
            }
            None => false,
        }
    }

    fn spawn_ticker(&self, id: LocalId) -> ProgressTicker {
        let session = self.session.clone();
        let signals = self.signals.clone();
        let ceiling = self.ticker.ceiling;

        ProgressTicker::spawn(self.ticker, move |step| {
            let mut session = lock(&session);
            match session.apply(id, SessionEvent::ProgressTick { step, ceiling }) {
                Ok(image) => {
                    if let Some(progress) = image.progress {
                        let _ = signals.send(SessionSignal::Progress {
                            local_id: id,
                            progress,
                        });
                    }
                    true
                }
                // No longer processing, or removed
                Err(_) => false,
            }
        })
    }

    /// Apply an event and emit signals for whatever changed.
    fn transition(&self, id: LocalId, event: SessionEvent) -> Result<UploadedImage, SessionError> {
        let (before, after) = {
            let mut session = lock(&self.session);
            let before = session.get(id).map(|img| (img.status, img.progress));
            let after = session.apply(id, event)?.clone();
            (before, after)
        };

        if before.map(|(status, _)| status) != Some(after.status) {
            let _ = self.signals.send(SessionSignal::Status {
                local_id: id,
                status: after.status,
            });
        }
        if let Some(progress) = after.progress {
            if before.and_then(|(_, p)| p) != Some(progress) {
                let _ = self.signals.send(SessionSignal::Progress {
                    local_id: id,
                    progress,
                });
            }
        }
        Ok(after)
    }

    fn notify(
        &self,
        id: LocalId,
        title: &str,
        description: impl Into<String>,
        severity: Severity,
    ) {
        let _ = self.signals.send(SessionSignal::Notice(Notice {
            local_id: id,
            title: title.to_string(),
            description: description.into(),
            severity,
        }));
    }
}

/// Lock the session, recovering the data if a holder panicked.
fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
