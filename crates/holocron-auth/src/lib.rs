//! Holocron Authentication and Authorization
//!
//! This crate provides JWT-based authentication, Argon2 password hashing,
//! the registration/login pipeline and role allow-list enforcement.

pub mod error;
pub mod guard;
pub mod jwt;
pub mod password;
pub mod service;

pub use error::AuthError;
pub use guard::{AccessPolicy, AuthUser, authenticate, extract_bearer_token};
pub use jwt::{Claims, JwtManager};
pub use password::{hash_password, verify_password};
pub use service::{AuthService, IssuedToken};
