//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be > 0".into(),
            ));
        }
        if self.server.max_upload_mb == 0 {
            return Err(ConfigError::ValidationError(
                "server.max_upload_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.transform.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "transform.timeout_ms must be > 0".into(),
            ));
        }
        if self.transform.prompt.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "transform.prompt must not be empty".into(),
            ));
        }
        if self.client.progress_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "client.progress_interval_ms must be > 0".into(),
            ));
        }
        if !(0.0..100.0).contains(&self.client.progress_ceiling) {
            return Err(ConfigError::ValidationError(
                "client.progress_ceiling must be between 0.0 and 100.0 (exclusive)".into(),
            ));
        }
        if self.client.progress_step_max <= 0.0 {
            return Err(ConfigError::ValidationError(
                "client.progress_step_max must be > 0".into(),
            ));
        }
        if self.client.preview_size == 0 {
            return Err(ConfigError::ValidationError(
                "client.preview_size must be > 0".into(),
            ));
        }
        Ok(())
    }
}
