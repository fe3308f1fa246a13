//! Magazine catalogue routes

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    models::{Magazine, MagazineInput, SearchField},
    state::AppState,
};

/// Search returns at most this many magazines
const SEARCH_LIMIT: usize = 5;

fn not_found() -> ApiError {
    ApiError::NotFound("Document not found".to_string())
}

/// Unparseable ids cannot name a document
fn parse_id(id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| not_found())
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub field: Option<String>,
    pub term: Option<String>,
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Magazine>>> {
    Ok(Json(state.magazines.list().await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Magazine>> {
    let id = parse_id(&id)?;
    state
        .magazines
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

pub async fn by_title(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> ApiResult<Json<Magazine>> {
    state
        .magazines
        .find_by_title(&title)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

pub async fn by_price(
    State(state): State<AppState>,
    Path(price): Path<String>,
) -> ApiResult<Json<Vec<Magazine>>> {
    Ok(Json(state.magazines.find_by_price(&price).await?))
}

/// GET /magazines/search?field=title&term=...
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Magazine>>> {
    let field: SearchField = query
        .field
        .as_deref()
        .unwrap_or("title")
        .parse()
        .map_err(ApiError::BadRequest)?;

    let term = query.term.unwrap_or_default();
    if term.trim().is_empty() {
        return Err(ApiError::BadRequest("term cannot be empty".to_string()));
    }

    Ok(Json(
        state
            .magazines
            .search(field, term.trim(), SEARCH_LIMIT)
            .await?,
    ))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<MagazineInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Magazine>)> {
    let Json(input) = payload?;
    input.validate().map_err(ApiError::BadRequest)?;

    let magazine = state.magazines.create(input).await?;
    tracing::info!(magazine_id = %magazine.id, by = %user.email, "Magazine created");
    Ok((StatusCode::CREATED, Json(magazine)))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<MagazineInput>, JsonRejection>,
) -> ApiResult<Json<Magazine>> {
    let Json(input) = payload?;
    let id = parse_id(&id)?;
    input.validate().map_err(ApiError::BadRequest)?;

    let magazine = state
        .magazines
        .update(id, input)
        .await?
        .ok_or_else(not_found)?;
    tracing::info!(magazine_id = %magazine.id, by = %user.email, "Magazine updated");
    Ok(Json(magazine))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id)?;
    if !state.magazines.delete(id).await? {
        return Err(not_found());
    }

    tracing::info!(magazine_id = %id, by = %user.email, "Magazine deleted");
    Ok(StatusCode::NO_CONTENT)
}
