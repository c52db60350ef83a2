//! OpenAI image-edit provider.
//!
//! Sends the image and instruction as a multipart form and expects the
//! result inline as base64 in `data[0].b64_json`.

use super::provider::{EditRequest, EditResponse, ImageEditor};
use crate::error::UpstreamError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::{Duration, Instant};

/// OpenAI provider using the Images Edit API.
pub struct OpenAiImageEditor {
    api_key: String,
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl OpenAiImageEditor {
    pub fn new(endpoint: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            timeout,
        }
    }

    fn classify(&self, e: reqwest::Error) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            UpstreamError::Transport(e.to_string())
        }
    }
}

// --- Response types ---

#[derive(Deserialize)]
pub(crate) struct ImagesResponse {
    #[serde(default)]
    data: Option<Vec<ImageDatum>>,
}

#[derive(Deserialize)]
struct ImageDatum {
    #[serde(default)]
    b64_json: Option<String>,
}

/// Pull the first inline image out of a parsed response body.
pub(crate) fn first_image(body: ImagesResponse) -> Result<Vec<u8>, UpstreamError> {
    let first = body
        .data
        .and_then(|data| data.into_iter().next())
        .ok_or(UpstreamError::EmptyResult)?;
    let payload = first
        .b64_json
        .filter(|b64| !b64.is_empty())
        .ok_or(UpstreamError::MissingPayload)?;
    BASE64
        .decode(payload.trim())
        .map_err(|e| UpstreamError::InvalidPayload(format!("payload is not base64: {e}")))
}

#[async_trait]
impl ImageEditor for OpenAiImageEditor {
    fn name(&self) -> &str {
        "openai"
    }

    async fn edit(&self, request: &EditRequest) -> Result<EditResponse, UpstreamError> {
        let start = Instant::now();

        let image_part = Part::bytes(request.image.clone())
            .file_name(request.file_name.clone())
            .mime_str("image/png")
            .map_err(|e| UpstreamError::Transport(format!("Invalid image part: {e}")))?;
        let form = Form::new()
            .part("image", image_part)
            .text("prompt", request.prompt.clone())
            .text("n", request.n.to_string())
            .text("size", request.size.clone())
            .text("response_format", request.response_format.clone());

        tracing::info!(
            file_name = %request.file_name,
            bytes = request.image.len(),
            "Sending image-edit request"
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = resp.text().await.map_err(|e| self.classify(e))?;
        let body: ImagesResponse = serde_json::from_str(&text)
            .map_err(|e| UpstreamError::Malformed(e.to_string()))?;
        let image = first_image(body)?;

        Ok(EditResponse {
            image,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
