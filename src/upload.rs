//! Asset upload client for the external image-hosting service.
//!
//! Uploads are best-effort by contract: any failure (missing key, network
//! error, non-success status, unexpected body) degrades to `None` so a
//! record submission never fails because a page upload did. The cause is
//! logged at the point of failure.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::warn;

use crate::config::UploadConfig;

/// Client for the form-POST upload API of the hosting service.
#[derive(Debug, Clone)]
pub struct UploadClient {
    http: reqwest::Client,
    config: UploadConfig,
}

impl UploadClient {
    /// Create a client over a shared HTTP connection pool.
    #[must_use]
    pub fn new(config: UploadConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Upload one asset and return its hosted URL.
    ///
    /// Returns `None` on any failure, never an error.
    pub async fn upload(&self, data: &[u8], name: &str) -> Option<String> {
        if self.config.api_key.is_empty() {
            warn!(name, "upload skipped: no api key configured");
            return None;
        }

        let form = [
            ("key", self.config.api_key.clone()),
            ("image", BASE64.encode(data)),
            ("name", name.to_owned()),
        ];

        let response = match self
            .http
            .post(&self.config.endpoint)
            .form(&form)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                warn!(name, error = %err, "upload request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(name, %status, "upload rejected by hosting service");
            return None;
        }

        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                warn!(name, error = %err, "upload response was not valid json");
                return None;
            }
        };

        if let Some(url) = extract_url(&body) {
            Some(url.to_owned())
        } else {
            warn!(name, "upload response missing data.url");
            None
        }
    }
}

/// Pull `data.url` out of a hosting-service response body.
fn extract_url(body: &serde_json::Value) -> Option<&str> {
    body.get("data")?.get("url")?.as_str()
}
