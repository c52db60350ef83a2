//! Image-edit API integration.
//!
//! Provides the provider abstraction the pipeline calls to beautify an image
//! and the OpenAI-compatible implementation behind it.

pub(crate) mod openai;
pub(crate) mod provider;

pub use openai::OpenAiImageEditor;
pub use provider::{
    png_file_name, resolve_env_var, EditRequest, EditResponse, ImageEditor, ImageEditorFactory,
};
