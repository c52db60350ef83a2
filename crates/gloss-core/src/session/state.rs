//! Per-image client state and its transition table.
//!
//! ```text
//! Added ──SubmitStarted──▶ Submitting ──SubmitSucceeded──▶ Submitted
//!   ▲                          │                            │   ▲
//!   └────────SubmitFailed──────┘              BeautifyStarted   BeautifyFailed
//!                                                           ▼   │
//!                              Completed ◀─BeautifySucceeded─ Processing ⟲ ProgressTick
//! ```
//!
//! Transitions are pure: [`UploadedImage::apply`] returns the next value and
//! leaves the input untouched. Failures fall back to the nearest stable state,
//! so a failed beautify never loses the server id.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::TransitionError;
use crate::types::ImageId;

/// Where an image is in the client flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    /// Selected locally, not yet sent
    Added,
    /// Upload in flight
    Submitting,
    /// Stored on the server, id known
    Submitted,
    /// Beautify in flight
    Processing,
    /// Enhanced result received
    Completed,
}

impl ImageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Submitting => "submitting",
            Self::Submitted => "submitted",
            Self::Processing => "processing",
            Self::Completed => "completed",
        }
    }

    /// Human-facing label for progress displays.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Added => "Ready",
            Self::Submitting => "Uploading",
            Self::Submitted => "Uploaded",
            Self::Processing => "Enhancing",
            Self::Completed => "Done",
        }
    }

    /// Whether a network call is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Submitting | Self::Processing)
    }
}

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to the transition table.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SubmitStarted,
    SubmitSucceeded(ImageId),
    SubmitFailed,
    BeautifyStarted,
    /// Cosmetic progress step, capped at `ceiling`
    ProgressTick { step: f32, ceiling: f32 },
    /// Inline previews of the enhanced results
    BeautifySucceeded(Vec<String>),
    BeautifyFailed,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SubmitStarted => "submit",
            Self::SubmitSucceeded(_) => "submit success",
            Self::SubmitFailed => "submit failure",
            Self::BeautifyStarted => "beautify",
            Self::ProgressTick { .. } => "progress tick",
            Self::BeautifySucceeded(_) => "beautify success",
            Self::BeautifyFailed => "beautify failure",
        }
    }
}

/// Session-local identifier; never sent to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LocalId(u64);

impl LocalId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The local file an image came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    /// File name sent with the upload
    pub name: String,
    /// Size in bytes
    pub size: u64,
}

impl LocalFile {
    pub fn new(path: impl AsRef<Path>, size: u64) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Self { path, name, size }
    }
}

/// Client-side view of one image.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedImage {
    pub local_id: LocalId,
    pub file: LocalFile,
    /// Thumbnail data URI, dropped when the image is removed
    pub local_preview: Option<String>,
    /// Id assigned by the server on upload
    pub server_id: Option<ImageId>,
    /// Inline previews of enhanced results
    pub enhanced: Option<Vec<String>>,
    pub status: ImageStatus,
    /// Percent complete while processing
    pub progress: Option<f32>,
}

impl UploadedImage {
    fn new(local_id: LocalId, file: LocalFile, local_preview: Option<String>) -> Self {
        Self {
            local_id,
            file,
            local_preview,
            server_id: None,
            enhanced: None,
            status: ImageStatus::Added,
            progress: None,
        }
    }

    /// Compute the state after `event`, or reject it.
    pub fn apply(&self, event: SessionEvent) -> Result<Self, TransitionError> {
        use ImageStatus::*;
        use SessionEvent::*;

        let mut next = self.clone();
        match (self.status, event) {
            (Added, SubmitStarted) => next.status = Submitting,
            (Submitting, SubmitSucceeded(id)) => {
                next.status = Submitted;
                next.server_id = Some(id);
            }
            (Submitting, SubmitFailed) => next.status = Added,
            (Submitted, BeautifyStarted) => {
                next.status = Processing;
                next.progress = Some(0.0);
            }
            (Processing, ProgressTick { step, ceiling }) => {
                let current = self.progress.unwrap_or(0.0);
                next.progress = Some((current + step.max(0.0)).min(ceiling).max(current));
            }
            (Processing, BeautifySucceeded(previews)) => {
                next.status = Completed;
                next.progress = Some(100.0);
                next.enhanced = Some(previews);
            }
            (Processing, BeautifyFailed) => {
                next.status = Submitted;
                next.progress = None;
            }
            (from, event) => {
                return Err(TransitionError {
                    from,
                    event: event.name(),
                })
            }
        }
        Ok(next)
    }
}

/// Ordered collection of the images a user is working on.
#[derive(Debug, Default)]
pub struct Session {
    images: Vec<UploadedImage>,
    next_id: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file in the `Added` state.
    pub fn add(&mut self, file: LocalFile, local_preview: Option<String>) -> LocalId {
        self.next_id += 1;
        let id = LocalId(self.next_id);
        self.images.push(UploadedImage::new(id, file, local_preview));
        id
    }

    pub fn get(&self, id: LocalId) -> Option<&UploadedImage> {
        self.images.iter().find(|img| img.local_id == id)
    }

    /// Images in insertion order.
    pub fn images(&self) -> &[UploadedImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Apply `event` to one image, replacing it only if the transition is accepted.
    pub fn apply(
        &mut self,
        id: LocalId,
        event: SessionEvent,
    ) -> Result<&UploadedImage, crate::error::SessionError> {
        let slot = self
            .images
            .iter_mut()
            .find(|img| img.local_id == id)
            .ok_or(crate::error::SessionError::UnknownImage(id))?;
        *slot = slot.apply(event)?;
        Ok(slot)
    }

    /// Drop an image in any state, releasing its local preview.
    ///
    /// In-flight server calls are not cancelled; their results are discarded
    /// because the id no longer resolves.
    pub fn remove(&mut self, id: LocalId) -> Option<UploadedImage> {
        let idx = self.images.iter().position(|img| img.local_id == id)?;
        let mut removed = self.images.remove(idx);
        removed.local_preview = None;
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;

    fn session_with_one() -> (Session, LocalId) {
        let mut session = Session::new();
        let id = session.add(
            LocalFile::new("/tmp/shoe.jpg", 1024),
            Some("data:image/webp;base64,AA==".to_string()),
        );
        (session, id)
    }

    fn tick(step: f32) -> SessionEvent {
        SessionEvent::ProgressTick {
            step,
            ceiling: 90.0,
        }
    }

    #[test]
    fn test_happy_path() {
        let (mut session, id) = session_with_one();
        let server_id = ImageId::new();

        session.apply(id, SessionEvent::SubmitStarted).unwrap();
        assert_eq!(session.get(id).unwrap().status, ImageStatus::Submitting);

        let img = session
            .apply(id, SessionEvent::SubmitSucceeded(server_id))
            .unwrap();
        assert_eq!(img.status, ImageStatus::Submitted);
        assert_eq!(img.server_id, Some(server_id));

        let img = session.apply(id, SessionEvent::BeautifyStarted).unwrap();
        assert_eq!(img.status, ImageStatus::Processing);
        assert_eq!(img.progress, Some(0.0));

        let img = session.apply(id, tick(7.5)).unwrap();
        assert_eq!(img.progress, Some(7.5));

        let img = session
            .apply(
                id,
                SessionEvent::BeautifySucceeded(vec!["data:image/png;base64,AA==".into()]),
            )
            .unwrap();
        assert_eq!(img.status, ImageStatus::Completed);
        assert_eq!(img.progress, Some(100.0));
        assert_eq!(img.enhanced.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_submit_failure_returns_to_added() {
        let (mut session, id) = session_with_one();
        session.apply(id, SessionEvent::SubmitStarted).unwrap();
        let img = session.apply(id, SessionEvent::SubmitFailed).unwrap();
        assert_eq!(img.status, ImageStatus::Added);
        assert!(img.server_id.is_none());
    }

    #[test]
    fn test_beautify_failure_returns_to_submitted() {
        let (mut session, id) = session_with_one();
        let server_id = ImageId::new();
        session.apply(id, SessionEvent::SubmitStarted).unwrap();
        session
            .apply(id, SessionEvent::SubmitSucceeded(server_id))
            .unwrap();
        session.apply(id, SessionEvent::BeautifyStarted).unwrap();
        session.apply(id, tick(40.0)).unwrap();

        let img = session.apply(id, SessionEvent::BeautifyFailed).unwrap();
        assert_eq!(img.status, ImageStatus::Submitted);
        assert_eq!(img.server_id, Some(server_id));
        assert!(img.progress.is_none());

        // Retry is accepted
        let img = session.apply(id, SessionEvent::BeautifyStarted).unwrap();
        assert_eq!(img.status, ImageStatus::Processing);
    }

    #[test]
    fn test_progress_is_capped_at_ceiling() {
        let (mut session, id) = session_with_one();
        session.apply(id, SessionEvent::SubmitStarted).unwrap();
        session
            .apply(id, SessionEvent::SubmitSucceeded(ImageId::new()))
            .unwrap();
        session.apply(id, SessionEvent::BeautifyStarted).unwrap();
        for _ in 0..20 {
            session.apply(id, tick(9.9)).unwrap();
        }
        assert_eq!(session.get(id).unwrap().progress, Some(90.0));
    }

    #[test]
    fn test_rejected_transitions_leave_state_untouched() {
        let (mut session, id) = session_with_one();
        let before = session.get(id).unwrap().clone();

        let err = session.apply(id, SessionEvent::BeautifyStarted).unwrap_err();
        match err {
            SessionError::Transition(e) => {
                assert_eq!(e.from, ImageStatus::Added);
                assert_eq!(e.event, "beautify");
            }
            other => panic!("Expected transition error, got {other:?}"),
        }
        assert!(session.apply(id, tick(1.0)).is_err());
        assert!(session.apply(id, SessionEvent::SubmitFailed).is_err());
        assert_eq!(session.get(id).unwrap(), &before);
    }

    #[test]
    fn test_processing_never_falls_back_to_added() {
        let img = UploadedImage {
            status: ImageStatus::Processing,
            progress: Some(10.0),
            server_id: Some(ImageId::new()),
            ..UploadedImage::new(
                LocalId(1),
                LocalFile::new("a.png", 1),
                None,
            )
        };
        assert!(img.apply(SessionEvent::SubmitFailed).is_err());
        assert!(img.apply(SessionEvent::SubmitStarted).is_err());
        assert_eq!(
            img.apply(SessionEvent::BeautifyFailed).unwrap().status,
            ImageStatus::Submitted
        );
    }

    #[test]
    fn test_remove_from_any_state() {
        let mut session = Session::new();
        let a = session.add(LocalFile::new("a.png", 1), Some("data:,a".into()));
        let b = session.add(LocalFile::new("b.png", 1), Some("data:,b".into()));
        session.apply(b, SessionEvent::SubmitStarted).unwrap();

        let removed = session.remove(b).unwrap();
        assert_eq!(removed.status, ImageStatus::Submitting);
        assert!(removed.local_preview.is_none());
        assert_eq!(session.len(), 1);
        assert!(session.get(a).is_some());
        assert!(session.remove(b).is_none());
    }

    #[test]
    fn test_unknown_image() {
        let mut session = Session::new();
        let err = session
            .apply(LocalId(42), SessionEvent::SubmitStarted)
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownImage(_)));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ImageStatus::Added.to_string(), "added");
        assert_eq!(ImageStatus::Processing.to_string(), "processing");
        assert!(ImageStatus::Submitting.is_busy());
        assert!(!ImageStatus::Completed.is_busy());
    }

    #[test]
    fn test_local_file_name() {
        let file = LocalFile::new("/photos/catalog/lamp.jpeg", 10);
        assert_eq!(file.name, "lamp.jpeg");
    }
}
