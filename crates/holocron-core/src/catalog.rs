//! Admin catalog operations

use holocron_db::{Movie, MovieStore, NewMovie};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::CoreError;

/// Partial movie update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoviePatch {
    pub episode_number: Option<i64>,
    pub title: Option<String>,
    pub director: Option<String>,
    pub release_date: Option<String>,
    pub description: Option<String>,
}

/// CRUD over the movie catalog
pub struct CatalogService {
    movies: Arc<dyn MovieStore>,
}

impl CatalogService {
    /// Create a new catalog service
    pub fn new(movies: Arc<dyn MovieStore>) -> Self {
        Self { movies }
    }

    /// List every movie
    pub async fn list(&self) -> Result<Vec<Movie>, CoreError> {
        Ok(self.movies.list_movies().await?)
    }

    /// Get a movie by local id
    pub async fn get(&self, id: i64) -> Result<Movie, CoreError> {
        self.movies
            .find_movie_by_id(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Movie with ID {} not found", id)))
    }

    /// Create a movie; the episode number must be free
    pub async fn create(&self, movie: NewMovie) -> Result<Movie, CoreError> {
        require_text("title", &movie.title)?;
        for (field, value) in [
            ("director", &movie.director),
            ("releaseDate", &movie.release_date),
            ("description", &movie.description),
        ] {
            if let Some(value) = value {
                require_text(field, value)?;
            }
        }

        debug!("Creating movie for episode {}", movie.episode_number);
        let created = self.movies.create_movie(movie).await?;
        info!(
            "Created movie {} (episode {})",
            created.id, created.episode_number
        );
        Ok(created)
    }

    /// Apply a partial update to an existing movie
    pub async fn update(&self, id: i64, patch: MoviePatch) -> Result<Movie, CoreError> {
        let mut movie = self.get(id).await?;

        if let Some(episode_number) = patch.episode_number {
            movie.episode_number = episode_number;
        }
        if let Some(title) = patch.title {
            require_text("title", &title)?;
            movie.title = title;
        }
        if let Some(director) = patch.director {
            movie.director = Some(director);
        }
        if let Some(release_date) = patch.release_date {
            movie.release_date = Some(release_date);
        }
        if let Some(description) = patch.description {
            movie.description = Some(description);
        }

        let updated = self.movies.update_movie(&movie).await?;
        info!("Updated movie {}", id);
        Ok(updated)
    }

    /// Delete an existing movie
    pub async fn delete(&self, id: i64) -> Result<(), CoreError> {
        let movie = self.get(id).await?;
        self.movies.delete_movie(&movie).await?;
        info!("Deleted movie {}", id);
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::BadRequest(format!("{} should not be empty", field)));
    }
    Ok(())
}
