//! Holocron Upstream Client
//!
//! This crate provides the client for the upstream paginated films API
//! and the [`FilmSource`] seam the sync engine pulls pages through.

pub mod client;
pub mod error;
pub mod types;

pub use client::{FilmSource, SwapiClient, SwapiClientConfig};
pub use error::ProxyError;
pub use types::{FilmPage, FilmRecord};
