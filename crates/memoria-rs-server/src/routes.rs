use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::debug;
use memoria_rs_memory::{
    ImportPayload, MemoryExport, MemoryInfo, MemoryRecord, SearchOptions,
    query::DEFAULT_SEARCH_LIMIT,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

/// Routes for the memory API.
///
/// `info`, `export` and `import` are literal segments and win over the
/// `{user_id}` capture, so those three names cannot be used as user ids.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/memory/info", get(info))
        .route("/memory/export", get(export))
        .route("/memory/import", post(import))
        .route("/memory/{user_id}", get(list).post(add))
        .route("/memory/{user_id}/search", get(search))
        .route("/memory/{user_id}/relevant", get(relevant))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct AddRecordRequest {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
    #[serde(default)]
    pub include_archive: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    #[serde(default)]
    pub include_archive: bool,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RelevantParams {
    pub k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportParams {
    pub merge: Option<bool>,
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn add(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiJson(payload): ApiJson<AddRecordRequest>,
) -> Result<(StatusCode, Json<MemoryRecord>), ApiError> {
    let record = state
        .run(move |store| store.add(&user_id, &payload.role, &payload.content, payload.tags))
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Vec<MemoryRecord>>, ApiError> {
    let records = state
        .run(move |store| store.get(&user_id, params.limit, params.include_archive))
        .await?;
    Ok(Json(records))
}

async fn search(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<Vec<MemoryRecord>>, ApiError> {
    let query = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("validation_error", "query parameter q is required"))?;
    let options = SearchOptions {
        include_archive: params.include_archive,
        limit: Some(params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT)),
    };
    let records = state
        .run(move |store| store.search(&user_id, &query, options))
        .await?;
    Ok(Json(records))
}

async fn relevant(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiQuery(params): ApiQuery<RelevantParams>,
) -> Result<Json<Vec<MemoryRecord>>, ApiError> {
    let max_k = state.limits.max_relevant_k;
    let k = params.k.unwrap_or(state.limits.default_relevant_k);
    if !(1..=max_k).contains(&k) {
        return Err(ApiError::bad_request(
            "invalid_argument",
            format!("k must be between 1 and {max_k}"),
        ));
    }
    let records = state
        .run(move |store| store.get_relevant(&user_id, k))
        .await?;
    Ok(Json(records))
}

async fn info(State(state): State<AppState>) -> Result<Json<MemoryInfo>, ApiError> {
    let info = state.run(|store| store.info()).await?;
    Ok(Json(info))
}

async fn export(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ExportParams>,
) -> Result<Json<MemoryExport>, ApiError> {
    let export = state
        .run(move |store| store.export(params.user_id.as_deref()))
        .await?;
    Ok(Json(export))
}

async fn import(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ImportParams>,
    ApiJson(payload): ApiJson<ImportPayload>,
) -> Result<StatusCode, ApiError> {
    let merge = params.merge.unwrap_or(true);
    debug!(
        "import request (active={}, archive={}, merge={merge})",
        payload.active.len(),
        payload.archive.len()
    );
    state.run(move |store| store.import(payload, merge)).await?;
    Ok(StatusCode::NO_CONTENT)
}
