//! User routes

use axum::{Json, Router, extract::State, routing::get};

use crate::error::ApiError;
use crate::extract::{Authorized, ViewProfile};
use crate::state::AppState;
use crate::types::UserResponse;

/// GET /user/profile
async fn profile(
    caller: Authorized<ViewProfile>,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.auth.profile(caller.user().id).await?;
    Ok(Json(user.into()))
}

/// Create user routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/user/profile", get(profile))
}
