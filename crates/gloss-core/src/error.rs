//! Error types for the Gloss enhancement pipeline.
//!
//! Errors are organized by layer so each boundary can map them to a specific
//! response: the HTTP handlers turn [`PipelineError`] into a status code, the
//! client session turns [`ClientError`] into a notification.

use thiserror::Error;

use crate::session::{ImageStatus, LocalId};

/// Top-level error type for Gloss operations.
#[derive(Error, Debug)]
pub enum GlossError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Server-side pipeline errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Client-side API errors
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Client session errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// A required credential is not set
    #[error("Missing credential: {0}")]
    MissingCredential(String),
}

/// Pipeline errors, one variant per failure class a caller can react to.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Missing or malformed input at the boundary
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Referenced record does not exist
    #[error("Image not found: {0}")]
    NotFound(String),

    /// Input could not be decoded or converted to the canonical encoding
    #[error("Normalization failed for {name}: {message}")]
    Normalization { name: String, message: String },

    /// A blocking stage exceeded its time budget
    #[error("Timeout in {stage} stage for {name} after {timeout_ms}ms")]
    Timeout {
        name: String,
        stage: String,
        timeout_ms: u64,
    },

    /// The image-edit API was unreachable or returned an unusable response
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Object store read or write failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),
}

/// Failures of the outbound image-edit call.
///
/// Each variant is reported separately so the caller can render a specific
/// message. None of them are retried.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// Connection, TLS or body transfer failure
    #[error("Image-edit request failed: {0}")]
    Transport(String),

    /// No response within the configured timeout
    #[error("Image-edit request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Non-success HTTP status
    #[error("Image-edit API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not the expected JSON document
    #[error("Failed to parse image-edit response: {0}")]
    Malformed(String),

    /// The result list was empty
    #[error("No images returned from image-edit API")]
    EmptyResult,

    /// The first result had no inline payload
    #[error("Invalid image from image-edit API: missing b64_json payload")]
    MissingPayload,

    /// The inline payload was not valid base64
    #[error("Invalid image from image-edit API: {0}")]
    InvalidPayload(String),
}

impl UpstreamError {
    /// Whether the upstream rejected the call for exceeding its rate limit.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Status { status: 429, .. })
    }

    /// Upstream-provided detail worth relaying to the caller, if any.
    pub fn details(&self) -> String {
        match self {
            Self::Status { body, .. } if !body.is_empty() => body.clone(),
            other => other.to_string(),
        }
    }
}

/// Object store failures.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite driver error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Database directory could not be created
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking store task failed to complete
    #[error("Store task failed: {0}")]
    Join(String),

    /// A persisted row could not be turned back into a record
    #[error("Corrupt record {id}: {message}")]
    Corrupt { id: String, message: String },
}

/// Errors seen by the client talking to a Gloss server.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Could not reach the server or read its response
    #[error("Request failed: {0}")]
    Transport(String),

    /// Server answered with a non-success status
    #[error("Server returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body was not what the API promises
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Beautify succeeded but carried no image
    #[error("No images received from server")]
    MissingPreview,

    /// Local file could not be read
    #[error("Cannot read {path}: {message}")]
    File { path: String, message: String },
}

/// An event that the client state machine does not accept in the current state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cannot apply {event} to an image that is {from}")]
pub struct TransitionError {
    pub from: ImageStatus,
    pub event: &'static str,
}

/// Errors raised while driving an image through the client session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// No image with this local id is in the session
    #[error("Unknown image {0}")]
    UnknownImage(LocalId),

    /// The image is not in a state that accepts the requested step
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Beautify was requested before the image reached the server
    #[error("Image {0} must be uploaded before beautification")]
    NotSubmitted(LocalId),

    /// The server call failed
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Convenience type alias for Gloss results.
pub type Result<T> = std::result::Result<T, GlossError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
