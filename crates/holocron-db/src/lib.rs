//! Holocron Database Layer
//!
//! This crate provides the persistence layer for Holocron: the user and
//! movie stores consumed by the auth pipeline and the sync engine, backed
//! by SQLite via sqlx.

pub mod error;
pub mod models;
pub mod repository;
pub mod store;

pub use error::DbError;
pub use models::*;
pub use repository::Database;
pub use store::{MovieStore, UserStore};
