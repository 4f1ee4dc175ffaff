//! Per-page layout context.
//!
//! Every full page shows the signed-in user, the cart badge, and any pending
//! flash notice. [`PageContext`] gathers them in one extractor so handlers
//! only pass it through to their template.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::middleware::auth::load_user;
use crate::models::{CurrentUser, Flash};
use crate::services::cart::cart_count;
use crate::state::AppState;

/// Data shared by the base layout.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user: Option<CurrentUser>,
    pub cart_count: u32,
    pub flash: Option<Flash>,
}

impl PageContext {
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// Role cached at sign-in; admin pages re-check it before serving.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.role.is_admin())
    }

    #[must_use]
    pub fn user_name(&self) -> &str {
        self.user.as_ref().map_or("", |u| u.name.as_str())
    }

    /// Initial for the avatar badge.
    #[must_use]
    pub fn user_initial(&self) -> String {
        self.user_name()
            .chars()
            .next()
            .map_or_else(|| "?".to_string(), |c| c.to_uppercase().collect())
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>().cloned() else {
            return Ok(Self::default());
        };

        Ok(Self {
            user: load_user(&session, state).await,
            cart_count: cart_count(&session).await,
            flash: Flash::take(&session).await,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_context() {
        let page = PageContext::default();
        assert!(!page.is_signed_in());
        assert!(!page.is_admin());
        assert_eq!(page.user_initial(), "?");
    }
}
