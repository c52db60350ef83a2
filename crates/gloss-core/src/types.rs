//! Core data types for the Gloss pipeline.
//!
//! An [`ImageRecord`] is one persisted image, either an original upload or a
//! beautified result. Records are append-only: a transformation produces a new
//! record and never touches its source.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::normalize::{content_hash, data_uri};

/// MIME type of the canonical encoding (PNG, RGBA8).
pub const CANONICAL_CONTENT_TYPE: &str = "image/png";

/// Opaque, immutable record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(Uuid);

impl ImageId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse the textual form, returning `None` if it is not a valid id.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ImageId {
    type Err = PipelineError;

    /// A string that is not a valid id cannot name a stored record, so it is
    /// reported as not found rather than as a validation failure.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| PipelineError::NotFound(s.to_string()))
    }
}

/// Binary payload plus its MIME type, as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// A record ready to be inserted; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub name: String,
    pub img: StoredImage,
    pub preview: String,
    pub content_hash: String,
    pub derived_from: Option<ImageId>,
}

impl NewImage {
    /// Build a record from bytes that are already in the canonical encoding.
    ///
    /// The preview and hash are derived here and nowhere else, so they can
    /// never disagree with `img.data`.
    pub fn from_canonical(
        name: impl Into<String>,
        png: Vec<u8>,
        derived_from: Option<ImageId>,
    ) -> Self {
        let preview = data_uri(CANONICAL_CONTENT_TYPE, &png);
        let content_hash = content_hash(&png);
        Self {
            name: name.into(),
            img: StoredImage {
                data: png,
                content_type: CANONICAL_CONTENT_TYPE.to_string(),
            },
            preview,
            content_hash,
            derived_from,
        }
    }
}

/// A persisted image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub id: ImageId,
    pub name: String,
    pub img: StoredImage,
    pub preview: String,
    pub content_hash: String,
    pub derived_from: Option<ImageId>,
    pub created_at_ms: u64,
}

impl ImageRecord {
    /// Materialize a record from an insert request.
    pub fn from_new(id: ImageId, new: NewImage, created_at_ms: u64) -> Self {
        Self {
            id,
            name: new.name,
            img: new.img,
            preview: new.preview,
            content_hash: new.content_hash,
            derived_from: new.derived_from,
            created_at_ms,
        }
    }
}

/// Outcome of a successful beautify call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeautifyOutcome {
    /// Id of the newly created derived record
    pub id: ImageId,
    /// Inline preview of the derived record
    pub preview: String,
}

/// Milliseconds since the unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
