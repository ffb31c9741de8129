//! Registration and login routes

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use holocron_auth::IssuedToken;

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;
use crate::types::{LoginRequest, RegisterRequest, UserResponse};

/// POST /auth/register
async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = state
        .auth
        .register(&request.username, &request.password, request.role.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// POST /auth/login
async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<IssuedToken>, ApiError> {
    let user = state
        .auth
        .validate_credentials(&request.username, &request.password)
        .await?
        .ok_or(holocron_auth::AuthError::InvalidCredentials)?;

    Ok(Json(state.auth.login(&user)?))
}

/// Create auth routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}
