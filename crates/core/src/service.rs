//! Remote background-removal service.
//!
//! The pipeline only depends on the [`SegmentationService`] trait: image
//! bytes in, a full-resolution cutout (transparent PNG) out.
//! [`HttpSegmentationClient`] is the production implementation, posting a
//! multipart upload to `<base>/cutout/segment`.

use crate::config::Config;
use crate::error::{AppError, Result};
use futures::future::BoxFuture;
use log::{debug, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

/// Opaque segmentation call.
pub trait SegmentationService: Send + Sync {
    /// Sends an encoded image and resolves to the encoded cutout.
    ///
    /// # Errors
    ///
    /// [`AppError::Transport`] when the service cannot be reached,
    /// [`AppError::Service`] when it answers with a failure.
    fn segment(&self, image: Vec<u8>, mime_type: &'static str) -> BoxFuture<'_, Result<Vec<u8>>>;
}

/// Error body shape used by the service for non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
    message: Option<String>,
}

pub struct HttpSegmentationClient {
    client: Client,
    segment_url: Url,
    health_url: Url,
}

impl HttpSegmentationClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("cutout-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            segment_url: config.segment_url()?,
            health_url: config.health_url()?,
        })
    }

    async fn post_segment(&self, image: Vec<u8>, mime_type: &'static str) -> Result<Vec<u8>> {
        let extension = mime_type.rsplit('/').next().unwrap_or("bin");
        let part = Part::bytes(image)
            .file_name(format!("upload.{}", extension))
            .mime_str(mime_type)
            .map_err(|e| AppError::transport(format!("Invalid upload MIME type: {}", e)))?;
        let form = Form::new().part("file", part);

        debug!("POST {}", self.segment_url);
        let response = self
            .client
            .post(self.segment_url.clone())
            .header(reqwest::header::ACCEPT, "image/png")
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::transport(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = AppError::service(Self::describe_failure(status, &body));
            warn!("{}", err);
            return Err(err);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::transport(format!("Failed to read response body: {}", e)))?;

        if bytes.is_empty() {
            return Err(AppError::service("Empty response body"));
        }
        Ok(bytes.to_vec())
    }

    fn describe_failure(status: StatusCode, body: &str) -> String {
        let detail = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.detail.or(b.message));
        match detail {
            Some(detail) => format!("HTTP {}: {}", status, detail),
            None => format!("HTTP {}", status),
        }
    }

    /// Probes `<base>/cutout/health`.
    pub async fn health_check(&self) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(self.health_url.clone())
            .send()
            .await
            .map_err(|e| AppError::transport(format!("Health check failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::service(format!("HTTP {}", status)));
        }
        response
            .json()
            .await
            .map_err(|e| AppError::service(format!("Malformed health response: {}", e)))
    }
}

impl SegmentationService for HttpSegmentationClient {
    fn segment(&self, image: Vec<u8>, mime_type: &'static str) -> BoxFuture<'_, Result<Vec<u8>>> {
        Box::pin(self.post_segment(image, mime_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_description_prefers_server_detail() {
        let msg = HttpSegmentationClient::describe_failure(
            StatusCode::BAD_REQUEST,
            r#"{"detail":"multipart/form-data required"}"#,
        );
        assert_eq!(msg, "HTTP 400 Bad Request: multipart/form-data required");
    }

    #[test]
    fn failure_description_falls_back_to_status() {
        let msg = HttpSegmentationClient::describe_failure(StatusCode::BAD_GATEWAY, "<html>");
        assert_eq!(msg, "HTTP 502 Bad Gateway");
    }

    #[test]
    fn client_targets_configured_endpoints() {
        let config = Config::builder()
            .with_base_url("http://127.0.0.1:9/api/v1/")
            .build()
            .unwrap();
        let client = HttpSegmentationClient::new(&config).unwrap();
        assert_eq!(client.segment_url.as_str(), "http://127.0.0.1:9/api/v1/cutout/segment");
    }
}
