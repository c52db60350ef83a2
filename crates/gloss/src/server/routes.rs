//! Request handlers.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use gloss_core::{BeautifyResponse, HealthResponse, ImageId, ImageView, PipelineError, UploadResponse};
use std::sync::Arc;

use super::error::ApiError;
use super::AppState;

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "image";

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: gloss_core::VERSION.to_string(),
    })
}

pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    // A missing body or a non-multipart content type carries no file
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Upload is not multipart");
        no_file()
    })?;
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        upload = Some((file_name, bytes.to_vec()));
    }

    let (file_name, bytes) = upload.ok_or_else(no_file)?;

    let id = state
        .pipeline
        .submit(&file_name, bytes)
        .await
        .map_err(ApiError::upload)?;

    Ok(Json(UploadResponse {
        message: "Image uploaded".to_string(),
        id,
    }))
}

fn no_file() -> ApiError {
    ApiError::upload(PipelineError::Validation("No file uploaded".into()))
}

pub async fn beautify(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BeautifyResponse>, ApiError> {
    let id: ImageId = id.parse().map_err(ApiError::beautify)?;
    let outcome = state
        .pipeline
        .beautify(id)
        .await
        .map_err(ApiError::beautify)?;

    Ok(Json(BeautifyResponse {
        message: "Beautified image generated".to_string(),
        image_id: outcome.id,
        image: Some(outcome.preview),
    }))
}

pub async fn get_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ImageView>, ApiError> {
    let id: ImageId = id.parse().map_err(ApiError::lookup)?;
    let record = state.pipeline.fetch(id).await.map_err(ApiError::lookup)?;
    Ok(Json(ImageView::from(record)))
}
