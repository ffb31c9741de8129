//! Access guard: bearer authentication and role allow-lists
//!
//! Every protected operation declares an [`AccessPolicy`]. Requests are
//! first authenticated with [`authenticate`], which yields an [`AuthUser`],
//! then checked against the policy with [`AccessPolicy::authorize`].

use holocron_db::UserRole;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AuthError;
use crate::jwt::{Claims, JwtManager};

/// Authenticated user information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
}

impl AuthUser {
    /// Create from JWT claims
    pub fn from_claims(claims: &Claims) -> Result<Self, AuthError> {
        let id = claims.sub.parse().map_err(|_| AuthError::InvalidToken)?;
        Ok(Self {
            id,
            username: claims.username.clone(),
            role: claims.role,
        })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn extract_bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingAuthHeader)?;
    let (scheme, token) = header
        .split_once(' ')
        .ok_or(AuthError::InvalidAuthHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthHeader);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

/// Authenticate a request from its raw `Authorization` header value
pub fn authenticate(jwt: &JwtManager, header: Option<&str>) -> Result<AuthUser, AuthError> {
    let token = extract_bearer_token(header)?;
    let claims = jwt.validate_token(token)?;
    let user = AuthUser::from_claims(&claims)?;

    debug!("Authenticated user: {} ({})", user.username, user.role);
    Ok(user)
}

/// Static role allow-list attached to a protected operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessPolicy {
    /// Operation name, for logs
    pub operation: &'static str,
    /// Roles permitted to invoke the operation
    pub allowed_roles: &'static [UserRole],
}

impl AccessPolicy {
    pub const PROFILE: AccessPolicy = AccessPolicy {
        operation: "user.profile",
        allowed_roles: &[UserRole::Regular, UserRole::Admin],
    };

    pub const MOVIE_READ: AccessPolicy = AccessPolicy {
        operation: "movies.read",
        allowed_roles: &[UserRole::Regular],
    };

    pub const MOVIE_CREATE: AccessPolicy = AccessPolicy {
        operation: "movies.create",
        allowed_roles: &[UserRole::Admin],
    };

    pub const MOVIE_UPDATE: AccessPolicy = AccessPolicy {
        operation: "movies.update",
        allowed_roles: &[UserRole::Admin],
    };

    pub const MOVIE_DELETE: AccessPolicy = AccessPolicy {
        operation: "movies.delete",
        allowed_roles: &[UserRole::Admin],
    };

    pub const CATALOG_SYNC: AccessPolicy = AccessPolicy {
        operation: "movies.sync",
        allowed_roles: &[UserRole::Admin],
    };

    /// Check the user's role against the allow-list
    ///
    /// Exact membership only: `admin` does not pass a `regular`-only policy.
    pub fn authorize(&self, user: &AuthUser) -> Result<(), AuthError> {
        if self.allowed_roles.contains(&user.role) {
            Ok(())
        } else {
            debug!(
                "Denied {} to {} ({})",
                self.operation, user.username, user.role
            );
            Err(AuthError::InsufficientPermissions)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(role: UserRole) -> AuthUser {
        AuthUser {
            id: 1,
            username: "luke".to_string(),
            role,
        }
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(Some("Bearer abc")).unwrap(), "abc");
        assert_eq!(extract_bearer_token(Some("bearer  abc ")).unwrap(), "abc");
        assert!(matches!(
            extract_bearer_token(None),
            Err(AuthError::MissingAuthHeader)
        ));
        assert!(matches!(
            extract_bearer_token(Some("Basic dXNlcjpwdw==")),
            Err(AuthError::InvalidAuthHeader)
        ));
        assert!(matches!(
            extract_bearer_token(Some("Bearer")),
            Err(AuthError::InvalidAuthHeader)
        ));
        assert!(matches!(
            extract_bearer_token(Some("Bearer   ")),
            Err(AuthError::InvalidAuthHeader)
        ));
    }

    #[test]
    fn test_authenticate_round_trip() {
        let jwt = JwtManager::new("secret", Duration::hours(1));
        let token = jwt.generate_token(42, "luke", UserRole::Regular).unwrap();
        let header = format!("Bearer {}", token);

        let authed = authenticate(&jwt, Some(&header)).unwrap();
        assert_eq!(authed.id, 42);
        assert_eq!(authed.role, UserRole::Regular);

        assert!(matches!(
            authenticate(&jwt, Some("Bearer nope")),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_no_role_hierarchy() {
        assert!(AccessPolicy::MOVIE_READ.authorize(&user(UserRole::Regular)).is_ok());
        assert!(matches!(
            AccessPolicy::MOVIE_READ.authorize(&user(UserRole::Admin)),
            Err(AuthError::InsufficientPermissions)
        ));
    }

    #[test]
    fn test_admin_only_policies_reject_regular() {
        for policy in [
            AccessPolicy::MOVIE_CREATE,
            AccessPolicy::MOVIE_UPDATE,
            AccessPolicy::MOVIE_DELETE,
            AccessPolicy::CATALOG_SYNC,
        ] {
            assert!(policy.authorize(&user(UserRole::Admin)).is_ok());
            assert!(policy.authorize(&user(UserRole::Regular)).is_err());
        }
    }

    #[test]
    fn test_profile_allows_both_roles() {
        assert!(AccessPolicy::PROFILE.authorize(&user(UserRole::Regular)).is_ok());
        assert!(AccessPolicy::PROFILE.authorize(&user(UserRole::Admin)).is_ok());
    }
}
