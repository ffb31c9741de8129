//! Movie catalog routes

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use holocron_core::MoviePatch;
use holocron_db::Movie;
use tracing::info;

use crate::error::ApiError;
use crate::extract::{
    Authorized, CreateMovie, DeleteMovie, JsonBody, ReadMovie, TriggerSync, UpdateMovie,
};
use crate::state::AppState;
use crate::types::{CreateMovieRequest, SyncResponse};

/// GET /movies
async fn list_movies(State(state): State<AppState>) -> Result<Json<Vec<Movie>>, ApiError> {
    Ok(Json(state.catalog.list().await?))
}

/// GET /movies/{id} (regular)
async fn get_movie(
    _caller: Authorized<ReadMovie>,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Movie>, ApiError> {
    Ok(Json(state.catalog.get(id).await?))
}

/// POST /movies (admin)
async fn create_movie(
    _caller: Authorized<CreateMovie>,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateMovieRequest>,
) -> Result<(StatusCode, Json<Movie>), ApiError> {
    let movie = state.catalog.create(request.into()).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

/// PATCH /movies/{id} (admin)
async fn update_movie(
    _caller: Authorized<UpdateMovie>,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonBody(patch): JsonBody<MoviePatch>,
) -> Result<Json<Movie>, ApiError> {
    Ok(Json(state.catalog.update(id, patch).await?))
}

/// DELETE /movies/{id} (admin)
async fn delete_movie(
    _caller: Authorized<DeleteMovie>,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /movies/sync (admin)
async fn sync_movies(
    caller: Authorized<TriggerSync>,
    State(state): State<AppState>,
) -> Result<Json<SyncResponse>, ApiError> {
    info!("Catalog sync triggered by {}", caller.user().username);

    let report = state.sync.run().await?;

    Ok(Json(SyncResponse {
        message: "Movies from Star Wars API added".to_string(),
        report,
    }))
}

/// Create movie routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/movies", get(list_movies).post(create_movie))
        .route("/movies/sync", post(sync_movies))
        .route(
            "/movies/{id}",
            get(get_movie).patch(update_movie).delete(delete_movie),
        )
}
