//! Gloss Core - product-photo upload and enhancement library.
//!
//! Gloss stores product photos in a canonical encoding and turns them into
//! clean e-commerce shots through an external image-edit API.
//!
//! # Architecture
//!
//! ```text
//! upload → Normalize (PNG RGBA8) → Store → Image-edit API → Normalize → Store (new record)
//! ```
//!
//! The server side lives in [`pipeline::Pipeline`]; the client side in
//! [`session::SessionDriver`], which tracks each image through upload and
//! beautify against any [`session::Backend`] (normally [`api::ApiClient`]).
//!
//! # Usage
//!
//! ```rust,ignore
//! use gloss_core::{open_store, Config, ImageEditorFactory, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> gloss_core::Result<()> {
//!     let config = Config::load()?;
//!     let store = open_store(&config).map_err(gloss_core::PipelineError::from)?;
//!     let editor = ImageEditorFactory::create(&config.transform)?;
//!     let pipeline = Pipeline::new(store, editor, config.limits.clone(), &config.transform);
//!
//!     let id = pipeline.submit("mug.jpg", std::fs::read("mug.jpg")?).await?;
//!     let result = pipeline.beautify(id).await?;
//!     println!("Beautified as {}", result.id);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod discovery;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod transform;
pub mod types;

pub use api::{ApiClient, BeautifyResponse, ErrorBody, HealthResponse, ImageView, UploadResponse};
pub use config::Config;
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use error::{
    ClientError, ConfigError, GlossError, PipelineError, PipelineResult, Result, SessionError,
    StoreError, TransitionError, UpstreamError,
};
pub use normalize::{CanonicalImage, Normalizer};
pub use pipeline::Pipeline;
pub use session::{ImageStatus, SessionDriver, SessionSignal};
pub use store::{open_store, ImageStore};
pub use transform::{ImageEditor, ImageEditorFactory};
pub use types::{BeautifyOutcome, ImageId, ImageRecord};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
