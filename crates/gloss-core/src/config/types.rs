//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Instruction sent with every image-edit request unless overridden.
pub const DEFAULT_PROMPT: &str = "Enhance colors, brightness, contrast, sharpen product details, \
     remove shadows, make background pure white, professional e-commerce product photo";

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Listening port
    pub port: u16,

    /// Browser origin permitted by CORS
    pub allowed_origin: String,

    /// Maximum request body size in megabytes
    pub max_upload_mb: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            allowed_origin: "http://localhost:8080".to_string(),
            max_upload_mb: 10,
        }
    }
}

/// Which object store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local, lost on restart
    Memory,
    /// Single-file SQLite database
    Sqlite,
}

/// Object store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend selection
    pub backend: StoreBackend,

    /// Database file for the SQLite backend (supports ~)
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: "~/.gloss/images.db".to_string(),
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode + re-encode timeout in milliseconds
    pub decode_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_image_dimension: 10000,
            decode_timeout_ms: 5000,
        }
    }
}

/// Image-edit API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Image-edit endpoint
    pub endpoint: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Instruction text sent with every image
    pub prompt: String,

    /// Requested output resolution
    pub size: String,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/images/edits".to_string(),
            api_key: "${OPENAI_API_KEY}".to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            size: "1024x1024".to_string(),
            timeout_ms: 60000,
        }
    }
}

/// Client session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the Gloss server
    pub server_url: String,

    /// Interval between cosmetic progress steps in milliseconds
    pub progress_interval_ms: u64,

    /// Upper bound of a single random progress step (percent)
    pub progress_step_max: f32,

    /// Progress never passes this value until the result arrives (percent)
    pub progress_ceiling: f32,

    /// Local preview size in pixels (longest edge)
    pub preview_size: u32,

    /// File extensions picked up when walking directories
    pub supported_formats: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5000".to_string(),
            progress_interval_ms: 300,
            progress_step_max: 10.0,
            progress_ceiling: 90.0,
            preview_size: 96,
            supported_formats: vec![
                "png".to_string(),
                "jpg".to_string(),
                "jpeg".to_string(),
                "webp".to_string(),
                "gif".to_string(),
            ],
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
