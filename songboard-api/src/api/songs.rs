//! Song endpoints
//!
//! Public: top5, remaining, list, by status, show, suggest.
//! Admin (signed in, then role-checked by the service): create, update,
//! approve, reject, delete.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use songboard_common::{Song, SongStatus};
use validator::Validate;

use crate::api::validated::{OptionalValidatedJson, ValidatedJson};
use crate::context::{Authenticated, RequestContext};
use crate::error::ServiceResult;
use crate::moderation::{CreateSong, EditSong};
use crate::pagination::{PageQuery, PageRequest, Paginated, DEFAULT_PER_PAGE, LIST_PER_PAGE};
use crate::AppState;

// ========================================
// Request schemas
// ========================================

#[derive(Debug, Deserialize, Validate)]
pub struct SuggestRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, message = "The youtube url field is required."),
        url(message = "The youtube url must be a valid URL.")
    )]
    pub youtube_url: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSongRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, message = "The youtube url field is required."),
        url(message = "The youtube url must be a valid URL.")
    )]
    pub youtube_url: String,
    #[validate(length(max = 255, message = "The title may not be greater than 255 characters."))]
    pub title: Option<String>,
    #[validate(length(max = 255, message = "The artist may not be greater than 255 characters."))]
    pub artist: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSongRequest {
    #[validate(length(min = 1, max = 255, message = "The title must be between 1 and 255 characters."))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 255, message = "The artist must be between 1 and 255 characters."))]
    pub artist: Option<String>,
    #[validate(url(message = "The youtube url must be a valid URL."))]
    pub youtube_url: Option<String>,
    pub status: Option<SongStatus>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct RejectRequest {
    #[validate(length(max = 1000, message = "The reason may not be greater than 1000 characters."))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

// ========================================
// Public handlers
// ========================================

/// GET /songs/top5
pub async fn top5(State(state): State<AppState>, ctx: RequestContext) -> ServiceResult<Json<Vec<Song>>> {
    Ok(Json(state.songs.top(&ctx).await?))
}

/// GET /songs/remaining
pub async fn remaining(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<PageQuery>,
) -> ServiceResult<Json<Paginated<Song>>> {
    let page = state.songs.remaining(&ctx, query.with_default(DEFAULT_PER_PAGE)).await?;
    Ok(Json(page.into()))
}

/// GET /songs
pub async fn index(
    State(state): State<AppState>,
    ctx: RequestContext,
    Query(query): Query<ListQuery>,
) -> ServiceResult<Json<Paginated<Song>>> {
    let page = PageRequest::new(query.page, query.per_page, LIST_PER_PAGE);
    let page = state
        .songs
        .list(&ctx, query.status.as_deref().filter(|s| !s.is_empty()), page)
        .await?;
    Ok(Json(page.into()))
}

/// GET /songs/status/:status
pub async fn by_status(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(status): Path<String>,
    Query(query): Query<PageQuery>,
) -> ServiceResult<Json<Paginated<Song>>> {
    let page = state
        .songs
        .by_status(&ctx, &status, query.with_default(DEFAULT_PER_PAGE))
        .await?;
    Ok(Json(page.into()))
}

/// GET /songs/:id
pub async fn show(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<i64>,
) -> ServiceResult<Json<Song>> {
    Ok(Json(state.songs.get(&ctx, id).await?))
}

/// POST /songs/suggest
pub async fn suggest(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(body): ValidatedJson<SuggestRequest>,
) -> ServiceResult<(StatusCode, Json<Value>)> {
    let song = state.songs.suggest(&ctx, &body.youtube_url).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Song suggestion submitted successfully",
            "data": song,
        })),
    ))
}

// ========================================
// Admin handlers
// ========================================

/// POST /songs
pub async fn store(
    State(state): State<AppState>,
    Authenticated(ctx): Authenticated,
    ValidatedJson(body): ValidatedJson<CreateSongRequest>,
) -> ServiceResult<(StatusCode, Json<Value>)> {
    let song = state
        .songs
        .create_direct(
            &ctx,
            CreateSong {
                youtube_url: body.youtube_url,
                title: body.title,
                artist: body.artist,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Song created successfully",
            "data": song,
        })),
    ))
}

/// PUT /songs/:id
pub async fn update(
    State(state): State<AppState>,
    Authenticated(ctx): Authenticated,
    Path(id): Path<i64>,
    ValidatedJson(body): ValidatedJson<UpdateSongRequest>,
) -> ServiceResult<Json<Value>> {
    let song = state
        .songs
        .edit(
            &ctx,
            id,
            EditSong {
                title: body.title,
                artist: body.artist,
                youtube_url: body.youtube_url,
                status: body.status,
            },
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Song updated successfully",
        "data": song,
    })))
}

/// POST /songs/:id/approve
pub async fn approve(
    State(state): State<AppState>,
    Authenticated(ctx): Authenticated,
    Path(id): Path<i64>,
) -> ServiceResult<Json<Value>> {
    let song = state.songs.approve(&ctx, id).await?;
    Ok(Json(json!({
        "message": "Song approved successfully",
        "data": song,
    })))
}

/// POST /songs/:id/reject
///
/// The body is optional; `{"reason": "..."}` is stored with the song. A
/// body that is present but invalid is a 422.
pub async fn reject(
    State(state): State<AppState>,
    Authenticated(ctx): Authenticated,
    Path(id): Path<i64>,
    OptionalValidatedJson(body): OptionalValidatedJson<RejectRequest>,
) -> ServiceResult<Json<Value>> {
    let reason = body.and_then(|b| b.reason);
    let song = state.songs.reject(&ctx, id, reason).await?;
    Ok(Json(json!({
        "message": "Song rejected successfully",
        "data": song,
    })))
}

/// DELETE /songs/:id
pub async fn destroy(
    State(state): State<AppState>,
    Authenticated(ctx): Authenticated,
    Path(id): Path<i64>,
) -> ServiceResult<Json<Value>> {
    state.songs.remove(&ctx, id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Song deleted successfully",
    })))
}

pub fn song_routes() -> Router<AppState> {
    Router::new()
        .route("/songs", get(index).post(store))
        .route("/songs/top5", get(top5))
        .route("/songs/remaining", get(remaining))
        .route("/songs/suggest", post(suggest))
        .route("/songs/status/:status", get(by_status))
        .route("/songs/:id", get(show).put(update).delete(destroy))
        .route("/songs/:id/approve", post(approve))
        .route("/songs/:id/reject", post(reject))
}
