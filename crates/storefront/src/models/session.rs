//! Session-related types.
//!
//! Types stored in the session for authentication state, the guest cart, and
//! one-shot notices.

use std::fmt;

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use bazaar_core::{Email, UserId, UserRole};

/// Access or refresh token issued by the auth API.
///
/// `Debug` is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub const fn new(token: String) -> Self {
        Self(token)
    }

    /// The raw token, for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the signed-in user and
/// call the backend on their behalf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Auth-service user id (also the `app_user` key).
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Role at sign-in; admin pages re-check it against the profile.
    #[serde(default)]
    pub role: UserRole,
    /// Token for row-level-security scoped requests.
    pub access_token: AccessToken,
    /// Token used to renew `access_token`.
    pub refresh_token: AccessToken,
    /// Unix timestamp when `access_token` expires.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl CurrentUser {
    /// Whether the access token expires within `margin_secs` of `now`.
    #[must_use]
    pub fn token_expires_within(&self, now: i64, margin_secs: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at - margin_secs <= now)
    }
}

/// Severity of a flash notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

impl FlashLevel {
    /// CSS modifier for the notice banner.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self {
            Self::Success => "flash-success",
            Self::Info => "flash-info",
            Self::Error => "flash-error",
        }
    }
}

/// A notice shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }

    /// Store the notice for the next page.
    ///
    /// Failures are logged and otherwise ignored; a lost notice never fails a request.
    pub async fn push(self, session: &Session) {
        if let Err(e) = session.insert(keys::FLASH, self).await {
            tracing::warn!(error = %e, "Failed to store flash message");
        }
    }

    /// Remove and return the pending notice, if any.
    pub async fn take(session: &Session) -> Option<Self> {
        session.remove::<Self>(keys::FLASH).await.ok().flatten()
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current signed-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the guest cart.
    pub const GUEST_CART: &str = "guest_cart";

    /// Key for the cached cart badge count.
    pub const CART_COUNT: &str = "cart_count";

    /// Key for the pending flash notice.
    pub const FLASH: &str = "flash";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(expires_at: Option<i64>) -> CurrentUser {
        CurrentUser {
            id: UserId::generate(),
            email: Email::parse("shopper@example.com").unwrap(),
            name: "Shopper".to_string(),
            role: UserRole::Customer,
            access_token: AccessToken::new("header.payload.signature".to_string()),
            refresh_token: AccessToken::new("refresh-value".to_string()),
            expires_at,
        }
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let debug_output = format!("{:?}", user(None));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("header.payload.signature"));
        assert!(!debug_output.contains("refresh-value"));
    }

    #[test]
    fn test_token_expiry_margin() {
        assert!(!user(None).token_expires_within(1_000, 60));
        assert!(user(Some(1_030)).token_expires_within(1_000, 60));
        assert!(!user(Some(2_000)).token_expires_within(1_000, 60));
    }

    #[test]
    fn test_flash_round_trips_through_json() {
        let flash = Flash::error("Order not found");
        let json = serde_json::to_string(&flash).unwrap();
        assert!(json.contains("\"error\""));
        assert_eq!(serde_json::from_str::<Flash>(&json).unwrap(), flash);
    }
}
