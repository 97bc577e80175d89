//! Multipart upload of the model artifact to a scoring endpoint.
//!
//! The artifact is streamed from disk byte-for-byte as a single file part. The server's
//! reply is kept whole so the caller can print it before deciding whether
//! the upload failed.

use reqwest::header::EXPECT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

use crate::error::ExportError;

/// Longest plain-text body shown to the user, in characters.
const MAX_TEXT_BODY_CHARS: usize = 2000;

#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub url: Url,
    /// Multipart field carrying the file.
    pub field_name: String,
    pub connect_timeout: Duration,
    /// Allowed silence between reads; large uploads can take a while to score.
    pub read_timeout: Duration,
}

impl UploadConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            field_name: "model".to_string(),
            connect_timeout: Duration::from_secs(20),
            read_timeout: Duration::from_secs(900),
        }
    }
}

/// Status and raw body returned by the endpoint.
#[derive(Debug, Clone)]
pub struct UploadResponse {
    pub status: StatusCode,
    pub body: String,
}

impl UploadResponse {
    /// The body pretty-printed as JSON when it parses, else truncated text.
    pub fn rendered_body(&self) -> String {
        render_body(&self.body)
    }

    /// Fails on 4xx and 5xx statuses.
    pub fn error_for_status(&self) -> Result<(), ExportError> {
        if self.status.is_client_error() || self.status.is_server_error() {
            return Err(ExportError::HttpStatus {
                status: self.status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Pretty JSON with four-space indentation, or the first characters of `body`.
pub fn render_body(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        if value.serialize(&mut ser).is_ok() {
            if let Ok(pretty) = String::from_utf8(buf) {
                return pretty;
            }
        }
    }
    body.chars().take(MAX_TEXT_BODY_CHARS).collect()
}

pub struct ModelUploader {
    client: Client,
    config: UploadConfig,
}

impl ModelUploader {
    pub fn new(config: UploadConfig) -> Result<Self, ExportError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .map_err(|e| ExportError::UploadFailed {
                file: String::new(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client, config })
    }

    pub fn url(&self) -> &Url {
        &self.config.url
    }

    /// Posts the file at `path` and returns the endpoint's reply.
    ///
    /// A non-2xx reply is still `Ok`; call
    /// [`UploadResponse::error_for_status`] after reporting it.
    pub async fn upload(&self, path: &Path) -> Result<UploadResponse, ExportError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "model".to_string());
        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();

        // Streamed from disk; the known length keeps the request un-chunked.
        let part = Part::stream_with_length(file, size).file_name(file_name.clone());
        let form = Form::new().part(self.config.field_name.clone(), part);

        let upload_failed = |e: reqwest::Error| ExportError::UploadFailed {
            file: file_name.clone(),
            reason: e.to_string(),
        };

        let resp = self
            .client
            .post(self.config.url.clone())
            .header(EXPECT, "100-continue")
            .multipart(form)
            .send()
            .await
            .map_err(upload_failed)?;

        let status = resp.status();
        let body = resp.text().await.map_err(upload_failed)?;

        tracing::info!(
            file = %file_name,
            bytes = size,
            status = status.as_u16(),
            "Upload finished"
        );
        Ok(UploadResponse { status, body })
    }
}
