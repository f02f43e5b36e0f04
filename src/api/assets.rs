//! Asset upload handler bridging to the hosting-service client.

use axum::extract::State;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::{AppError, Result};

/// Request body for `POST /assets`.
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// Name under which the asset is stored.
    pub name: String,
    /// Base64-encoded asset bytes.
    pub data_base64: String,
}

/// Response body: the hosted URL, or null when the upload degraded.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Hosted asset URL.
    pub url: Option<String>,
}

/// Handler for `POST /assets`. Uploads one asset.
///
/// A failed upload is not an HTTP error: the response carries `url: null`
/// and the caller's submission flow continues without the asset.
///
/// # Errors
///
/// Returns `AppError::Validation` when `data_base64` does not decode.
pub async fn upload(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadResponse>> {
    let data = BASE64
        .decode(req.data_base64.as_bytes())
        .map_err(|err| AppError::Validation(format!("data_base64 is not valid base64: {err}")))?;
    let url = state.uploader.upload(&data, &req.name).await;
    Ok(Json(UploadResponse { url }))
}
