//! HTTP API surface for record management.
//!
//! Thin layer over the repository: handlers validate caller input, call one
//! repository or collaborator operation, and map [`AppError`] onto HTTP
//! statuses in a single place. Everything except `/health` and `/login`
//! sits behind the shared-password middleware.

pub mod assets;
pub mod auth;
pub mod records;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::GlobalConfig;
use crate::persistence::person_repo::PersonRepo;
use crate::upload::UploadClient;
use crate::{AppError, Result};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Validated configuration with credentials loaded.
    pub config: Arc<GlobalConfig>,
    /// Person repository.
    pub repo: PersonRepo,
    /// Best-effort asset uploader.
    pub uploader: UploadClient,
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Config(_) | Self::Db(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Server-side causes are logged here and kept out of the body.
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "internal error".to_owned()
        } else {
            warn!(error = %self, "request rejected");
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Liveness probe. Always 200; no credential required.
async fn health() -> &'static str {
    "ok"
}

/// Assemble the full application router.
#[must_use]
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/records",
            get(records::list)
                .post(records::create)
                .delete(records::clear),
        )
        .route(
            "/records/{id}",
            get(records::get_by_id)
                .put(records::update)
                .delete(records::remove),
        )
        .route("/assets", post(assets::upload))
        // route_layer, not layer: the gate must run only on matched routes
        // so unknown paths still fall through to 404.
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/login", post(auth::login))
        .merge(protected)
        .with_state(state)
}

/// Serve the API until the cancellation token fires.
///
/// # Errors
///
/// Returns `AppError::Config` if the listener cannot bind and
/// `AppError::Io` if the server fails while running.
pub async fn serve(state: AppState, ct: CancellationToken) -> Result<()> {
    let bind = state.config.bind_addr()?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind HTTP on {bind}: {err}")))?;

    info!(%bind, "starting record API");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            ct.cancelled().await;
        })
        .await
        .map_err(|err| AppError::Io(format!("HTTP server error: {err}")))?;

    info!("record API shut down");
    Ok(())
}
