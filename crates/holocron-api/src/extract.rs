//! Request extractors
//!
//! [`RequireAuth`] verifies the bearer token; [`Authorized`] additionally
//! checks the verified role against the operation's [`AccessPolicy`]. Both
//! reject before the handler body runs. [`JsonBody`] parses request bodies
//! and reports malformed ones as [`ApiError::BadRequest`].

use axum::{
    extract::{FromRef, FromRequest, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use holocron_auth::{AccessPolicy, AuthUser, authenticate};
use std::marker::PhantomData;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// JSON request body rejected through [`ApiError`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Extractor for authenticated user (required)
pub struct RequireAuth(pub AuthUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let user = authenticate(app_state.auth.jwt(), header).map_err(|e| {
            debug!("Rejected request: {}", e);
            ApiError::Unauthorized
        })?;

        Ok(RequireAuth(user))
    }
}

/// Binds a protected operation to its role allow-list
pub trait Protected {
    const POLICY: AccessPolicy;
}

/// Extractor for a user permitted by `P`'s policy
pub struct Authorized<P: Protected>(pub AuthUser, PhantomData<fn() -> P>);

impl<P: Protected> Authorized<P> {
    pub fn user(&self) -> &AuthUser {
        &self.0
    }
}

impl<S, P> FromRequestParts<S> for Authorized<P>
where
    AppState: FromRef<S>,
    S: Send + Sync,
    P: Protected,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;

        P::POLICY
            .authorize(&user)
            .map_err(|_| ApiError::Forbidden)?;

        Ok(Authorized(user, PhantomData))
    }
}

macro_rules! protected {
    ($($(#[$meta:meta])* $name:ident => $policy:expr;)+) => {
        $(
            $(#[$meta])*
            pub enum $name {}

            impl Protected for $name {
                const POLICY: AccessPolicy = $policy;
            }
        )+
    };
}

protected! {
    /// `GET /user/profile`
    ViewProfile => AccessPolicy::PROFILE;
    /// `GET /movies/{id}`
    ReadMovie => AccessPolicy::MOVIE_READ;
    /// `POST /movies`
    CreateMovie => AccessPolicy::MOVIE_CREATE;
    /// `PATCH /movies/{id}`
    UpdateMovie => AccessPolicy::MOVIE_UPDATE;
    /// `DELETE /movies/{id}`
    DeleteMovie => AccessPolicy::MOVIE_DELETE;
    /// `POST /movies/sync`
    TriggerSync => AccessPolicy::CATALOG_SYNC;
}
