//! Holocron Core Business Logic
//!
//! This crate provides the catalog reconciliation engine that mirrors the
//! upstream films API into local storage, and the admin catalog operations.

pub mod catalog;
pub mod error;
pub mod sync;

pub use catalog::{CatalogService, MoviePatch};
pub use error::CoreError;
pub use sync::{SyncConfig, SyncEngine, SyncReport, SyncState};
pub use tokio_util::sync::CancellationToken;
