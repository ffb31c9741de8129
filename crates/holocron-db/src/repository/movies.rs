//! Movie operations

use async_trait::async_trait;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{Movie, NewMovie};
use crate::repository::Database;
use crate::store::MovieStore;

#[async_trait]
impl MovieStore for Database {
    async fn find_movie_by_episode(&self, episode_number: i64) -> Result<Option<Movie>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, episode_number, title, director, release_date, description
            FROM movies
            WHERE episode_number = ?
            "#,
        )
        .bind(episode_number)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| Movie::try_from(&row).map_err(DbError::from)).transpose()
    }

    async fn find_movie_by_id(&self, id: i64) -> Result<Option<Movie>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, episode_number, title, director, release_date, description
            FROM movies
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| Movie::try_from(&row).map_err(DbError::from)).transpose()
    }

    async fn list_movies(&self) -> Result<Vec<Movie>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT id, episode_number, title, director, release_date, description
            FROM movies
            ORDER BY episode_number
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Movie::try_from(row).map_err(DbError::from))
            .collect()
    }

    async fn create_movie(&self, movie: NewMovie) -> Result<Movie, DbError> {
        let result = sqlx::query(
            r#"
            INSERT INTO movies (episode_number, title, director, release_date, description)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(movie.episode_number)
        .bind(&movie.title)
        .bind(&movie.director)
        .bind(&movie.release_date)
        .bind(&movie.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DbError::from_write(e, || {
                format!("Movie with episode number {} already exists", movie.episode_number)
            })
        })?;

        let id: i64 = result.get("id");

        Ok(Movie {
            id,
            episode_number: movie.episode_number,
            title: movie.title,
            director: movie.director,
            release_date: movie.release_date,
            description: movie.description,
        })
    }

    async fn update_movie(&self, movie: &Movie) -> Result<Movie, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE movies
            SET episode_number = ?, title = ?, director = ?, release_date = ?, description = ?
            WHERE id = ?
            "#,
        )
        .bind(movie.episode_number)
        .bind(&movie.title)
        .bind(&movie.director)
        .bind(&movie.release_date)
        .bind(&movie.description)
        .bind(movie.id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DbError::from_write(e, || {
                format!("Movie with episode number {} already exists", movie.episode_number)
            })
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Movie: {}", movie.id)));
        }

        Ok(movie.clone())
    }

    async fn delete_movie(&self, movie: &Movie) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM movies WHERE id = ?")
            .bind(movie.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("Movie: {}", movie.id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_movie(episode_number: i64, title: &str) -> NewMovie {
        NewMovie {
            episode_number,
            title: title.to_string(),
            director: Some("George Lucas".to_string()),
            release_date: None,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_movie_crud() {
        let db = Database::in_memory().await.unwrap();

        let created = db.create_movie(new_movie(4, "A New Hope")).await.unwrap();
        let found = db.find_movie_by_episode(4).await.unwrap().unwrap();
        assert_eq!(found, created);

        let mut edited = found.clone();
        edited.title = "Star Wars".to_string();
        db.update_movie(&edited).await.unwrap();
        let reloaded = db.find_movie_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(reloaded.title, "Star Wars");

        db.delete_movie(&reloaded).await.unwrap();
        assert!(db.find_movie_by_id(created.id).await.unwrap().is_none());
        assert!(matches!(
            db.delete_movie(&reloaded).await,
            Err(DbError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_episode_number_is_unique() {
        let db = Database::in_memory().await.unwrap();
        db.create_movie(new_movie(5, "The Empire Strikes Back")).await.unwrap();
        let other = db.create_movie(new_movie(6, "Return of the Jedi")).await.unwrap();

        let err = db.create_movie(new_movie(5, "Duplicate")).await.unwrap_err();
        assert!(matches!(err, DbError::Duplicate(_)));

        let mut clash = other.clone();
        clash.episode_number = 5;
        let err = db.update_movie(&clash).await.unwrap_err();
        assert!(matches!(err, DbError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_list_movies_ordered_by_episode() {
        let db = Database::in_memory().await.unwrap();
        db.create_movie(new_movie(6, "Return of the Jedi")).await.unwrap();
        db.create_movie(new_movie(1, "The Phantom Menace")).await.unwrap();

        let episodes: Vec<i64> = db
            .list_movies()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.episode_number)
            .collect();
        assert_eq!(episodes, vec![1, 6]);
    }
}
