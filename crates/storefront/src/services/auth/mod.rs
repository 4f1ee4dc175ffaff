//! Authentication service.
//!
//! Credentials are checked by the hosted auth API; this service turns the
//! resulting session into a [`CurrentUser`] in the browser session, makes
//! sure the user has a profile row, and folds any guest cart into it.

mod error;

pub use error::AuthError;

use chrono::Utc;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{Email, UserRole};

use crate::backend::{AuthSession, BackendClient, BackendError, SignUpOutcome};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{AccessToken, CurrentUser, session_keys};
use crate::services::cart::merge_guest_cart_on_sign_in;

/// Minimum password length accepted by the hosted auth service.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Renew access tokens this many seconds before they expire.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Result of a sign-up.
#[derive(Debug)]
pub enum SignUpResult {
    /// Signed in straight away.
    SignedIn(Box<CurrentUser>),
    /// The user must confirm their email before signing in.
    ConfirmationRequired,
}

/// Authentication service.
pub struct AuthService<'a> {
    backend: &'a BackendClient,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(backend: &'a BackendClient) -> Self {
        Self { backend }
    }

    /// Sign in with email and password.
    ///
    /// On success the user is stored in the session, their profile exists,
    /// and the guest cart has been merged into their stored cart.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for a wrong email or password.
    #[instrument(skip(self, session, email, password))]
    pub async fn sign_in(
        &self,
        session: &Session,
        email: &str,
        password: &str,
    ) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;
        let auth = self
            .backend
            .auth()
            .sign_in_with_password(&email, password)
            .await
            .map_err(|e| match e {
                BackendError::Unauthorized(_) => AuthError::InvalidCredentials,
                other => AuthError::Backend(other),
            })?;

        self.establish(session, auth, &email).await
    }

    /// Register a new account, signing in immediately when the auth service allows it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` or `AuthError::UserAlreadyExists`
    /// when the registration is refused.
    #[instrument(skip(self, session, name, email, password))]
    pub async fn sign_up(
        &self,
        session: &Session,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<SignUpResult, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let name = name.trim();

        let outcome = self
            .backend
            .auth()
            .sign_up(&email, password, name)
            .await
            .map_err(|e| match e {
                BackendError::Conflict(_) => AuthError::UserAlreadyExists,
                BackendError::Api { message, .. } => AuthError::Rejected(message),
                other => AuthError::Backend(other),
            })?;

        match outcome {
            SignUpOutcome::SignedIn(auth) => {
                let user = self.establish(session, *auth, &email).await?;
                Ok(SignUpResult::SignedIn(Box::new(user)))
            }
            SignUpOutcome::ConfirmationRequired(auth_user) => {
                // Create the profile now so the first sign-in finds it.
                self.backend
                    .privileged()
                    .users()
                    .ensure(auth_user.id, Some(name), &email)
                    .await?;
                Ok(SignUpResult::ConfirmationRequired)
            }
        }
    }

    /// Sign out: revoke the token (best effort) and drop the session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Session` if the session cannot be cleared.
    pub async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        if let Some(user) = current_user(session).await
            && let Err(e) = self
                .backend
                .auth()
                .sign_out(user.access_token.expose())
                .await
        {
            tracing::warn!(error = %e, "Token revocation failed");
        }
        session.flush().await?;
        clear_sentry_user();
        Ok(())
    }

    /// Send a password recovery email.
    ///
    /// Unknown addresses are not reported, so the form cannot be used to discover
    /// which emails have accounts.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed address.
    pub async fn recover(&self, email: &str, redirect_to: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;
        match self.backend.auth().recover(&email, Some(redirect_to)).await {
            Ok(()) | Err(BackendError::NotFound(_)) => Ok(()),
            Err(BackendError::RateLimited(_)) => Err(AuthError::Rejected(
                "Too many requests. Please wait a moment and try again.".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Renew the access token if it is about to expire.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionExpired` (and signs the user out) when the
    /// refresh token has been revoked.
    pub async fn refresh_if_needed(
        &self,
        session: &Session,
        user: CurrentUser,
    ) -> Result<CurrentUser, AuthError> {
        if !user.token_expires_within(Utc::now().timestamp(), REFRESH_MARGIN_SECS) {
            return Ok(user);
        }

        match self
            .backend
            .auth()
            .refresh_session(user.refresh_token.expose())
            .await
        {
            Ok(auth) => {
                let refreshed = CurrentUser {
                    access_token: AccessToken::new(auth.access_token),
                    refresh_token: AccessToken::new(auth.refresh_token),
                    expires_at: expires_at(auth.expires_at, auth.expires_in),
                    ..user
                };
                session
                    .insert(session_keys::CURRENT_USER, &refreshed)
                    .await?;
                tracing::debug!(user_id = %refreshed.id, "Access token refreshed");
                Ok(refreshed)
            }
            Err(BackendError::Unauthorized(_)) => {
                session.flush().await?;
                Err(AuthError::SessionExpired)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn establish(
        &self,
        session: &Session,
        auth: AuthSession,
        email: &Email,
    ) -> Result<CurrentUser, AuthError> {
        let (profile, created) = self
            .backend
            .privileged()
            .users()
            .ensure(auth.user.id, auth.user.name(), email)
            .await?;
        if created {
            tracing::info!(user_id = %auth.user.id, "Profile created on sign-in");
        }

        let name = if profile.user_name.trim().is_empty() {
            email.local_part().to_string()
        } else {
            profile.user_name.clone()
        };

        let user = CurrentUser {
            id: auth.user.id,
            email: email.clone(),
            name,
            role: profile.user_role,
            access_token: AccessToken::new(auth.access_token),
            refresh_token: AccessToken::new(auth.refresh_token),
            expires_at: expires_at(auth.expires_at, auth.expires_in),
        };

        // The user is only stored once the guest cart is safely merged, so a
        // failed merge leaves the visitor signed out with their cart intact.
        merge_guest_cart_on_sign_in(self.backend, session, &user).await?;

        // New session id on privilege change.
        session.cycle_id().await?;
        session.insert(session_keys::CURRENT_USER, &user).await?;
        set_sentry_user(&user.id, Some(user.email.as_str()));

        Ok(user)
    }
}

/// The signed-in user stored in the session, if any.
pub async fn current_user(session: &Session) -> Option<CurrentUser> {
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Update the role cached in the session (after self-promotion).
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn set_session_role(
    session: &Session,
    mut user: CurrentUser,
    role: UserRole,
) -> Result<CurrentUser, tower_sessions::session::Error> {
    user.role = role;
    session.insert(session_keys::CURRENT_USER, &user).await?;
    Ok(user)
}

/// Only local absolute paths are accepted as post-sign-in redirect targets.
#[must_use]
pub fn safe_redirect(target: Option<&str>) -> String {
    match target.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

fn expires_at(expires_at: Option<i64>, expires_in: i64) -> Option<i64> {
    expires_at.or_else(|| (expires_in > 0).then(|| Utc::now().timestamp() + expires_in))
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_redirect_accepts_local_paths() {
        assert_eq!(safe_redirect(Some("/orders")), "/orders");
        assert_eq!(safe_redirect(Some("/products?type=Home")), "/products?type=Home");
    }

    #[test]
    fn test_safe_redirect_rejects_external_targets() {
        assert_eq!(safe_redirect(None), "/");
        assert_eq!(safe_redirect(Some("")), "/");
        assert_eq!(safe_redirect(Some("https://evil.test")), "/");
        assert_eq!(safe_redirect(Some("//evil.test")), "/");
        assert_eq!(safe_redirect(Some("/\\evil.test")), "/");
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_expires_at_prefers_absolute_timestamp() {
        assert_eq!(expires_at(Some(42), 3600), Some(42));
        assert_eq!(expires_at(None, 0), None);
        assert!(expires_at(None, 3600).is_some_and(|t| t > Utc::now().timestamp()));
    }
}
