//! Authentication error types.

use thiserror::Error;

use crate::backend::BackendError;
use crate::services::cart::CartError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] bazaar_core::EmailError),

    /// Invalid credentials (wrong password or unknown email).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account already exists for this email.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// The auth service refused the request for another reason.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Session expired and could not be renewed.
    #[error("session expired")]
    SessionExpired,

    /// Backend request failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session store failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Merging the guest cart failed.
    #[error("cart error: {0}")]
    Cart(#[from] CartError),
}
