//! HTTP API wire types and the client that speaks them.
//!
//! The server and the CLI client share these types so the JSON shape is
//! defined in one place.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::session::Backend;
use crate::types::{ImageId, ImageRecord};

/// `POST /upload` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub id: ImageId,
}

/// `POST /beautify/:id` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeautifyResponse {
    pub message: String,
    /// Id of the newly created record
    pub image_id: ImageId,
    /// Inline preview of the new record
    #[serde(default)]
    pub image: Option<String>,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// `GET /images/:id` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageView {
    pub id: ImageId,
    pub name: String,
    pub content_type: String,
    pub preview: String,
    #[serde(default)]
    pub derived_from: Option<ImageId>,
    pub created_at_ms: u64,
}

impl From<ImageRecord> for ImageView {
    fn from(record: ImageRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            content_type: record.img.content_type,
            preview: record.preview,
            derived_from: record.derived_from,
            created_at_ms: record.created_at_ms,
        }
    }
}

/// `GET /health` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Client for a running Gloss server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        let resp = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        read_json(resp).await
    }

    /// Fetch a stored record's metadata and preview.
    pub async fn image(&self, id: ImageId) -> Result<ImageView, ClientError> {
        let resp = self
            .client
            .get(self.url(&format!("/images/{id}")))
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        read_json(resp).await
    }
}

/// Decode a success body, or turn an error body into [`ClientError::Status`].
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|e| ClientError::Transport(e.to_string()))?;

    if !status.is_success() {
        let message = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => match body.details {
                Some(details) => format!("{}: {}", body.error, details),
                None => body.error,
            },
            Err(_) => text,
        };
        return Err(ClientError::Status {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
}

#[async_trait]
impl Backend for ApiClient {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadResponse, ClientError> {
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new().part("image", part);

        tracing::debug!(file_name, "Uploading image");
        let resp = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        read_json(resp).await
    }

    async fn beautify(&self, id: ImageId) -> Result<BeautifyResponse, ClientError> {
        tracing::debug!(%id, "Requesting beautify");
        let resp = self
            .client
            .post(self.url(&format!("/beautify/{id}")))
            .json(&serde_json::json!({ "imageId": id }))
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let mut body: BeautifyResponse = read_json(resp).await?;

        // Servers may answer with the id alone; the preview is then fetched separately
        if body.image.is_none() {
            tracing::debug!(id = %body.image_id, "Beautify response had no preview, fetching it");
            body.image = Some(self.image(body.image_id).await?.preview);
        }
        Ok(body)
    }
}
