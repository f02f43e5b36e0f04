//! Shared-password gate for the record API.
//!
//! One secret for everyone: `POST /login` checks it, and every protected
//! route expects it back as a bearer credential. No tokens are minted and
//! nothing expires server-side.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::AppState;
use crate::{AppError, Result};

/// Request body for `POST /login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Candidate shared password.
    pub password: String,
}

/// Compare a candidate against the shared password.
///
/// Both sides are digested first so the comparison never short-circuits
/// on length.
#[must_use]
pub fn verify_password(candidate: &str, expected: &str) -> bool {
    Sha256::digest(candidate.as_bytes()) == Sha256::digest(expected.as_bytes())
}

/// Handler for `POST /login`. Verifies the shared password.
///
/// # Errors
///
/// Returns `AppError::Unauthorized` when the password does not match.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<StatusCode> {
    if verify_password(&req.password, &state.config.web_password) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Unauthorized("wrong password".into()))
    }
}

/// Middleware requiring `Authorization: Bearer <shared password>`.
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match bearer_token(&request) {
        Some(token) if verify_password(token, &state.config.web_password) => {
            next.run(request).await
        }
        Some(_) => AppError::Unauthorized("wrong credential".into()).into_response(),
        None => AppError::Unauthorized("missing bearer credential".into()).into_response(),
    }
}

/// Extract the bearer token from a request, if one is present.
fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
