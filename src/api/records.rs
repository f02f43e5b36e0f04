//! Record CRUD and search handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::models::person::{PersonDraft, PersonRecord};
use crate::{AppError, Result};

/// Query string for `GET /records`.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Case-insensitive substring matched against full names.
    #[serde(default)]
    pub q: Option<String>,
}

/// Response body for a created record.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    /// Generated record identifier.
    pub id: i64,
}

/// Response body for a bulk delete.
#[derive(Debug, Serialize)]
pub struct ClearedResponse {
    /// Number of persons removed.
    pub deleted: u64,
}

/// Handler for `GET /records`. Full listing, or search when `q` is
/// non-blank. A blank `q` means "no search", not "match nothing".
///
/// # Errors
///
/// Returns `AppError::Db` if retrieval fails.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<PersonRecord>>> {
    let records = match params.q.as_deref().map(str::trim) {
        Some(needle) if !needle.is_empty() => state.repo.search_by_name(needle).await?,
        _ => state.repo.list_all().await?,
    };
    Ok(Json(records))
}

/// Handler for `POST /records`. Validates and persists a new person.
///
/// # Errors
///
/// Returns `AppError::Validation` for blank mandatory fields and
/// `AppError::Db` if the insert fails.
pub async fn create(
    State(state): State<AppState>,
    Json(draft): Json<PersonDraft>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    draft.validate()?;
    let id = state.repo.create(&draft).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

/// Handler for `GET /records/{id}`.
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown id and `AppError::Db` if
/// retrieval fails.
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PersonRecord>> {
    let record = state
        .repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("person {id} not found")))?;
    Ok(Json(record))
}

/// Handler for `PUT /records/{id}`. Full rewrite of scalars and children.
///
/// # Errors
///
/// Returns `AppError::Validation` for blank mandatory fields,
/// `AppError::NotFound` for an unknown id, and `AppError::Db` if the
/// rewrite fails.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(draft): Json<PersonDraft>,
) -> Result<StatusCode> {
    draft.validate()?;
    state.repo.update(id, &draft).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for `DELETE /records/{id}`.
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown id and `AppError::Db` if
/// the delete fails.
pub async fn remove(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    state.repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for `DELETE /records`. Clears every record. No undo.
///
/// # Errors
///
/// Returns `AppError::Db` if the bulk delete fails.
pub async fn clear(State(state): State<AppState>) -> Result<Json<ClearedResponse>> {
    let deleted = state.repo.delete_all().await?;
    Ok(Json(ClearedResponse { deleted }))
}
