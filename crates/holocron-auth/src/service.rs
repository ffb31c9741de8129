//! Registration and login pipeline

use holocron_db::{NewUser, User, UserRole, UserStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::AuthError;
use crate::jwt::JwtManager;
use crate::password::{hash_password, verify_password};

/// Maximum allowed username length
const MAX_USERNAME_LENGTH: usize = 64;
/// Maximum allowed password length (prevent DoS with very large passwords)
const MAX_PASSWORD_LENGTH: usize = 256;

/// Token handed back to a client after a successful login
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Orchestrates credential checks, token issuance and registration
pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt: Arc<JwtManager>,
    /// Verified against when the username is unknown, so both failure
    /// paths cost one hash verification
    dummy_hash: String,
}

impl AuthService {
    /// Create a new auth service
    pub fn new(users: Arc<dyn UserStore>, jwt: Arc<JwtManager>) -> Result<Self, AuthError> {
        let dummy_hash = hash_password("holocron-timing-equalizer")?;
        Ok(Self {
            users,
            jwt,
            dummy_hash,
        })
    }

    /// Token manager used to verify bearer tokens
    pub fn jwt(&self) -> &JwtManager {
        &self.jwt
    }

    /// Register a new user
    ///
    /// `role` defaults to `regular`; anything other than `regular` or
    /// `admin` is a validation error.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        role: Option<&str>,
    ) -> Result<User, AuthError> {
        validate_username(username)?;
        validate_password(password)?;

        let role = match role {
            Some(r) => r
                .parse::<UserRole>()
                .map_err(|_| AuthError::Validation("Role must be either regular or admin".to_string()))?,
            None => UserRole::default(),
        };

        debug!("Registering user: {}", username);

        let password_hash = hash_password(password)?;
        let user = self
            .users
            .create_user(NewUser {
                username: username.to_string(),
                password_hash,
                role,
            })
            .await?;

        info!("Registered user {} ({})", user.username, user.role);
        Ok(user)
    }

    /// Check a username/password pair
    ///
    /// Unknown user and wrong password both yield `None`.
    pub async fn validate_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, AuthError> {
        debug!("Login attempt for user: {}", username);

        let user = self.users.find_user_by_username(username).await?;

        let hash_to_verify = match &user {
            Some(u) => u.password_hash.as_str(),
            None => self.dummy_hash.as_str(),
        };
        let password_valid = verify_password(password, hash_to_verify)?;

        match (user, password_valid) {
            (Some(u), true) => Ok(Some(u)),
            _ => {
                metrics::counter!("holocron_logins_total", "outcome" => "rejected").increment(1);
                Ok(None)
            }
        }
    }

    /// Issue a token for an already validated user
    pub fn login(&self, user: &User) -> Result<IssuedToken, AuthError> {
        let access_token = self.jwt.generate_token(user.id, &user.username, user.role)?;

        metrics::counter!("holocron_logins_total", "outcome" => "success").increment(1);
        info!("User {} logged in successfully", user.username);

        Ok(IssuedToken {
            access_token,
            token_type: "Bearer",
            expires_in: self.jwt.ttl_secs(),
        })
    }

    /// Load the profile of the calling user
    pub async fn profile(&self, user_id: i64) -> Result<User, AuthError> {
        self.users
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Validate username format and length
fn validate_username(username: &str) -> Result<(), AuthError> {
    if username.is_empty() {
        return Err(AuthError::Validation("Username cannot be empty".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(AuthError::Validation(format!(
            "Username exceeds maximum length of {} characters",
            MAX_USERNAME_LENGTH
        )));
    }
    // Only allow ASCII alphanumeric characters, underscores, and hyphens
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AuthError::Validation(
            "Username can only contain ASCII letters, digits, underscores, and hyphens"
                .to_string(),
        ));
    }
    Ok(())
}

/// Validate password length
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::Validation("Password cannot be empty".to_string()));
    }
    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "Password exceeds maximum length of {} characters",
            MAX_PASSWORD_LENGTH
        )));
    }
    Ok(())
}
