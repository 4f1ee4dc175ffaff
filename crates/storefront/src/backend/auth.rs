//! Hosted auth API: password sign-in, sign-up, refresh, sign-out, recovery.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use bazaar_core::{Email, UserId};

use super::client::BackendClient;
use super::rest::check;
use super::BackendError;

/// An authenticated session issued by the auth API.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: i64,
    /// Unix timestamp when the access token expires.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

/// The auth service's view of a user.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl AuthUser {
    /// Display name given at sign-up, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.user_metadata
            .get("name")
            .and_then(serde_json::Value::as_str)
            .filter(|n| !n.trim().is_empty())
    }
}

/// Result of a sign-up request.
///
/// When email confirmation is enabled the auth API returns only the user;
/// otherwise it signs the new user in straight away.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpOutcome {
    SignedIn(Box<AuthSession>),
    ConfirmationRequired(AuthUser),
}

/// Handle for auth API calls.
pub struct AuthApi<'a> {
    client: &'a BackendClient,
}

impl<'a> AuthApi<'a> {
    pub(crate) const fn new(client: &'a BackendClient) -> Self {
        Self { client }
    }

    /// Exchange email and password for a session.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unauthorized` for wrong credentials.
    #[instrument(skip(self, email, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let body = json!({ "email": email.as_str(), "password": password });
        let session = self.token("password", &body).await?;
        tracing::info!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }

    /// Exchange a refresh token for a new session.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Unauthorized` if the refresh token is no longer valid.
    #[instrument(skip_all)]
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        self.token("refresh_token", &json!({ "refresh_token": refresh_token }))
            .await
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Conflict` if the email is already registered.
    #[instrument(skip(self, email, password, name))]
    pub async fn sign_up(
        &self,
        email: &Email,
        password: &str,
        name: &str,
    ) -> Result<SignUpOutcome, BackendError> {
        let url = self.client.endpoint(&["auth", "v1", "signup"])?;
        let body = json!({
            "email": email.as_str(),
            "password": password,
            "data": { "name": name },
        });
        let response = self
            .client
            .http()
            .post(url)
            .header("apikey", self.client.anon_key())
            .json(&body)
            .send()
            .await?;

        let response = check(response).await.map_err(|e| match e {
            BackendError::Api { code, message, .. }
                if code.as_deref() == Some("user_already_exists")
                    || message.contains("already registered") =>
            {
                BackendError::Conflict(message)
            }
            other => other,
        })?;
        Ok(response.json().await?)
    }

    /// Revoke the session behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails. An already-expired token
    /// is treated as success.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let url = self.client.endpoint(&["auth", "v1", "logout"])?;
        let response = self
            .client
            .http()
            .post(url)
            .header("apikey", self.client.anon_key())
            .bearer_auth(access_token)
            .send()
            .await?;
        match check(response).await {
            Ok(_) | Err(BackendError::Unauthorized(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Send a password recovery email.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self, email))]
    pub async fn recover(&self, email: &Email, redirect_to: Option<&str>) -> Result<(), BackendError> {
        let mut url = self.client.endpoint(&["auth", "v1", "recover"])?;
        if let Some(target) = redirect_to {
            url.query_pairs_mut().append_pair("redirect_to", target);
        }
        let response = self
            .client
            .http()
            .post(url)
            .header("apikey", self.client.anon_key())
            .json(&json!({ "email": email.as_str() }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn token(
        &self,
        grant_type: &str,
        body: &serde_json::Value,
    ) -> Result<AuthSession, BackendError> {
        let mut url = self.client.endpoint(&["auth", "v1", "token"])?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        let response = self
            .client
            .http()
            .post(url)
            .header("apikey", self.client.anon_key())
            .json(body)
            .send()
            .await?;

        // The token endpoint reports bad credentials as 400.
        let response = check(response).await.map_err(|e| match e {
            BackendError::Api {
                status, message, ..
            } if status == StatusCode::BAD_REQUEST.as_u16() => BackendError::Unauthorized(message),
            other => other,
        })?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_up_outcome_with_session() {
        let json = r#"{
            "access_token": "at", "refresh_token": "rt", "expires_in": 3600, "expires_at": 1700000000,
            "token_type": "bearer",
            "user": {"id": "6c1f0d6e-2a5e-4f7b-9a43-3f7c0a3e9b11", "email": "a@b.c", "user_metadata": {"name": "Ada"}}
        }"#;
        let outcome: SignUpOutcome = serde_json::from_str(json).unwrap();
        match outcome {
            SignUpOutcome::SignedIn(session) => assert_eq!(session.user.name(), Some("Ada")),
            SignUpOutcome::ConfirmationRequired(_) => panic!("expected a session"),
        }
    }

    #[test]
    fn test_sign_up_outcome_pending_confirmation() {
        let json = r#"{"id": "6c1f0d6e-2a5e-4f7b-9a43-3f7c0a3e9b11", "email": "a@b.c", "user_metadata": {}}"#;
        let outcome: SignUpOutcome = serde_json::from_str(json).unwrap();
        assert!(matches!(outcome, SignUpOutcome::ConfirmationRequired(ref u) if u.name().is_none()));
    }
}
