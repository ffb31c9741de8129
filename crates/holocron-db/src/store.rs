//! Store traits consumed by the auth pipeline and the catalog engine
//!
//! `Database` implements both; tests and alternative backends can supply
//! their own implementations.

use async_trait::async_trait;

use crate::error::DbError;
use crate::models::{Movie, NewMovie, NewUser, User};

/// User lookup and creation
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by unique username
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, DbError>;

    /// Find a user by id
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, DbError>;

    /// Create a user; fails with `DbError::Duplicate` when the username is taken
    async fn create_user(&self, user: NewUser) -> Result<User, DbError>;
}

/// Movie persistence keyed by episode number
#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Find a movie by its natural key
    async fn find_movie_by_episode(&self, episode_number: i64) -> Result<Option<Movie>, DbError>;

    /// Find a movie by its local id
    async fn find_movie_by_id(&self, id: i64) -> Result<Option<Movie>, DbError>;

    /// List every stored movie, ordered by episode number
    async fn list_movies(&self) -> Result<Vec<Movie>, DbError>;

    /// Insert a movie; fails with `DbError::Duplicate` when the episode number is taken
    async fn create_movie(&self, movie: NewMovie) -> Result<Movie, DbError>;

    /// Persist all fields of an existing movie
    async fn update_movie(&self, movie: &Movie) -> Result<Movie, DbError>;

    /// Delete an existing movie
    async fn delete_movie(&self, movie: &Movie) -> Result<(), DbError>;
}
