//! Admin role management.
//!
//! # Usage
//!
//! ```bash
//! bzr-cli admin promote -e owner@example.com
//! bzr-cli admin demote -e former@example.com
//! ```
//!
//! The account must already have a profile row (it is created on first sign-in).
//!
//! # Environment Variables
//!
//! - `BACKEND_URL`, `BACKEND_ANON_KEY`, `BACKEND_SERVICE_ROLE_KEY`

use thiserror::Error;

use bazaar_core::{Email, EmailError, UserRole};
use bazaar_storefront::backend::{BackendClient, BackendError};
use bazaar_storefront::config::{BackendConfig, ConfigError};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Backend settings are missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// No profile row for this email.
    #[error("No user found with email: {0}")]
    UserNotFound(String),

    /// Backend request failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Set the role of the account registered under `email`.
///
/// # Errors
///
/// Returns `AdminError` if the email is malformed, no profile matches, or the
/// backend rejects the update.
pub async fn set_role(email: &str, role: UserRole) -> Result<(), AdminError> {
    dotenvy::dotenv().ok();
    let email = Email::parse(email)?;

    let backend = BackendClient::new(&BackendConfig::from_env()?);
    let users = backend.privileged().users();

    let profile = users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AdminError::UserNotFound(email.to_string()))?;

    if profile.user_role == role {
        tracing::info!("{} already has role {}", email, role);
        return Ok(());
    }

    users.set_role(profile.user_id, role).await?;
    tracing::info!(
        "Role updated! User: {}, Email: {}, Role: {}",
        profile.user_id,
        email,
        role
    );
    Ok(())
}
