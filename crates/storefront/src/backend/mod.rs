//! Client for the hosted backend (REST data API and auth API).
//!
//! # Architecture
//!
//! - All application data lives in the hosted Postgres and is reached over
//!   its PostgREST-style REST API; nothing is synced locally
//! - Authentication is delegated to the hosted auth API (password grant,
//!   sign-up, refresh, recovery)
//! - Row-level security is enforced by the backend, so every request picks an
//!   access level: anonymous, the signed-in user's token, or the privileged
//!   service role
//! - Catalog reads are cached in memory via `moka` (5 minute TTL)
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_storefront::backend::BackendClient;
//!
//! let client = BackendClient::new(&config.backend);
//!
//! // Public catalog read
//! let product = client.anon().products().get(ProductNo::new(1)).await?;
//!
//! // Signed-in user's own profile
//! let profile = client.as_user(&token).users().get(user_id).await?;
//! ```

mod auth;
mod cache;
mod client;
pub mod orders;
pub mod products;
pub mod rest;
pub mod types;
pub mod users;

pub use auth::{AuthApi, AuthSession, AuthUser, SignUpOutcome};
pub use client::BackendClient;
pub use orders::OrderRepository;
pub use products::{PriceBand, ProductFilter, ProductRepository};
pub use rest::{Query, Rest};
pub use types::*;
pub use users::UserRepository;

use serde::Deserialize;
use thiserror::Error;

/// SQLSTATE for a unique constraint violation.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the request.
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A row with the same key already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Missing, expired, or rejected credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The configured base URL cannot carry a path.
    #[error("Invalid backend URL")]
    InvalidUrl,
}

impl BackendError {
    /// Whether the error is a unique-key conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Conflict(_) => true,
            Self::Api { code, .. } => code.as_deref() == Some(UNIQUE_VIOLATION),
            _ => false,
        }
    }
}

/// Error body returned by the REST and auth APIs.
///
/// The REST API sends `{code, message, details, hint}`; the auth API sends
/// `{error, error_description}` or `{code, msg, error_code}`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default, deserialize_with = "code_as_string")]
    pub code: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default, alias = "msg", alias = "error_description")]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl ApiErrorBody {
    /// Parse an error body, falling back to the raw text.
    pub(crate) fn parse(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_else(|_| Self {
            message: Some(text.chars().take(200).collect()),
            ..Self::default()
        })
    }

    /// The most specific machine-readable code.
    pub(crate) fn code(&self) -> Option<String> {
        self.error_code
            .clone()
            .or_else(|| self.code.clone())
            .or_else(|| self.error.clone())
    }

    /// Human-readable summary including details and hint when present.
    pub(crate) fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(message) = self.message.as_ref().or(self.error.as_ref()) {
            parts.push(message.clone());
        }
        if let Some(details) = &self.details {
            parts.push(format!("details: {details}"));
        }
        if let Some(hint) = &self.hint {
            parts.push(format!("hint: {hint}"));
        }
        if parts.is_empty() {
            "(no error details provided)".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// The auth API sends numeric HTTP codes in `code`; the REST API sends SQLSTATE strings.
fn code_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
