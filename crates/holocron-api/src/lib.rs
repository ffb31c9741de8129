//! Holocron REST API
//!
//! This crate provides the Axum-based HTTP API for Holocron: registration
//! and login, the caller's profile, and the movie catalog with its sync
//! trigger.

pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
pub mod types;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, MetricsHandle};
