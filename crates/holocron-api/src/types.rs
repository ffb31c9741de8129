//! Request/Response DTOs

use holocron_core::SyncReport;
use holocron_db::{NewMovie, User, UserRole};
use serde::{Deserialize, Serialize};

// ==================== Auth Types ====================

/// Registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// ==================== User Types ====================

/// Public view of a user
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

// ==================== Movie Types ====================

/// Create movie request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMovieRequest {
    pub episode_number: i64,
    pub title: String,
    pub director: String,
    pub release_date: String,
    pub description: String,
}

impl From<CreateMovieRequest> for NewMovie {
    fn from(request: CreateMovieRequest) -> Self {
        Self {
            episode_number: request.episode_number,
            title: request.title,
            director: Some(request.director),
            release_date: Some(request.release_date),
            description: Some(request.description),
        }
    }
}

/// Sync trigger response
#[derive(Serialize)]
pub struct SyncResponse {
    pub message: String,
    #[serde(flatten)]
    pub report: SyncReport,
}
