//! Image-edit provider trait and request/response types.
//!
//! Defines the interface the pipeline calls to beautify an image, plus the
//! factory that builds the configured provider.

use crate::config::TransformConfig;
use crate::error::{ConfigError, UpstreamError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Number of results requested per call. One keeps the cost down.
pub const RESULT_COUNT: u32 = 1;

/// Result encoding requested from the API: inline base64, not a URL.
pub const RESPONSE_FORMAT: &str = "b64_json";

/// A request to edit one image.
#[derive(Debug, Clone)]
pub struct EditRequest {
    /// Canonical PNG bytes
    pub image: Vec<u8>,
    /// File name sent with the image part
    pub file_name: String,
    /// Instruction text
    pub prompt: String,
    /// Number of results
    pub n: u32,
    /// Output resolution, e.g. "1024x1024"
    pub size: String,
    /// Result encoding
    pub response_format: String,
}

impl EditRequest {
    /// Build a single-result, inline-encoded request for a canonical image.
    pub fn new(png: Vec<u8>, source_name: &str, prompt: &str, size: &str) -> Self {
        Self {
            image: png,
            file_name: png_file_name(source_name),
            prompt: prompt.to_string(),
            n: RESULT_COUNT,
            size: size.to_string(),
            response_format: RESPONSE_FORMAT.to_string(),
        }
    }
}

/// Replace everything from the first dot onward with `.png`.
///
/// Names without a dot are passed through unchanged.
pub fn png_file_name(name: &str) -> String {
    match name.find('.') {
        Some(idx) if idx + 1 < name.len() => format!("{}.png", &name[..idx]),
        _ => name.to_string(),
    }
}

/// The decoded result of an edit call.
#[derive(Debug, Clone)]
pub struct EditResponse {
    /// Raw bytes of the first returned image
    pub image: Vec<u8>,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all image-edit providers implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the pipeline holds an `Arc<dyn ImageEditor>`).
#[async_trait]
pub trait ImageEditor: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Send one image and instruction, returning the first result.
    async fn edit(&self, request: &EditRequest) -> Result<EditResponse, UpstreamError>;

    /// Per-request timeout for this provider.
    fn timeout(&self) -> Duration;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Factory that creates the image-edit provider from config.
pub struct ImageEditorFactory;

impl ImageEditorFactory {
    /// Create the provider described by `config`.
    ///
    /// Fails if the API key reference does not resolve.
    pub fn create(config: &TransformConfig) -> Result<Arc<dyn ImageEditor>, ConfigError> {
        let api_key = resolve_env_var(&config.api_key).ok_or_else(|| {
            ConfigError::MissingCredential(format!(
                "image-edit API key not set ({}). Set OPENAI_API_KEY env var.",
                config.api_key
            ))
        })?;
        Ok(Arc::new(super::openai::OpenAiImageEditor::new(
            &config.endpoint,
            &api_key,
            Duration::from_millis(config.timeout_ms),
        )))
    }
}
