//! Authentication extractors.
//!
//! Handlers declare what they need in their signature:
//!
//! - [`OptionalAuth`] for pages guests may see
//! - [`RequireAuth`] for pages that need a signed-in user
//! - [`RequireAdmin`] for the admin panel
//!
//! All three renew the access token when it is close to expiring, so
//! handlers can call the backend with the user's token straight away.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::CurrentUser;
use crate::services::AuthService;
use crate::services::auth::current_user;
use crate::state::AppState;

/// Sign-in page that protected pages redirect to.
pub const SIGN_IN_PATH: &str = "/auth/signin";

/// Extractor that requires a signed-in user.
///
/// Guests are redirected to the sign-in page with a `redirect` parameter
/// pointing back at the requested page. JSON API requests get a 401 instead.
///
/// # Example
///
/// ```rust,ignore
/// async fn orders(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Orders for {}", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that optionally gets the signed-in user.
pub struct OptionalAuth(pub Option<CurrentUser>);

/// Extractor that requires a signed-in admin.
///
/// The role is re-read from the profile row on every request, so demoting a
/// user takes effect without waiting for them to sign out.
pub struct RequireAdmin(pub CurrentUser);

/// Why an authentication extractor refused the request.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the sign-in page, then back to `return_to`.
    RedirectToSignIn { return_to: String },
    /// 401 for API requests.
    Unauthorized,
    /// Signed in but not allowed; back to the home page.
    NotAdmin,
    /// The session store could not be read.
    SessionUnavailable,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToSignIn { return_to } => {
                Redirect::to(&sign_in_url(&return_to)).into_response()
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::NotAdmin => Redirect::to("/").into_response(),
            Self::SessionUnavailable => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// Sign-in URL that returns to `return_to` afterwards.
#[must_use]
pub fn sign_in_url(return_to: &str) -> String {
    format!(
        "{SIGN_IN_PATH}?redirect={}",
        urlencoding::encode(return_to)
    )
}

/// Path and query of the request as the client sent it (before nesting).
fn requested_path(parts: &Parts) -> String {
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0);
    uri.path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string)
}

/// Load the signed-in user from the session, renewing the token if needed.
///
/// A user whose refresh token has been revoked is signed out and treated as
/// a guest.
pub(crate) async fn load_user(session: &Session, state: &AppState) -> Option<CurrentUser> {
    let user = current_user(session).await?;
    match AuthService::new(state.backend())
        .refresh_if_needed(session, user)
        .await
    {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::info!(error = %e, "Dropping session user after failed refresh");
            None
        }
    }
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::SessionUnavailable)?;

        match load_user(&session, state).await {
            Some(user) => Ok(Self(user)),
            None => {
                let return_to = requested_path(parts);
                if return_to.starts_with("/api/") {
                    Err(AuthRejection::Unauthorized)
                } else {
                    Err(AuthRejection::RedirectToSignIn { return_to })
                }
            }
        }
    }
}

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>().cloned() {
            Some(session) => load_user(&session, state).await,
            None => None,
        };
        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;

        let profile = state
            .backend()
            .as_user(&user.access_token)
            .users()
            .get(user.id)
            .await;

        match profile {
            Ok(Some(profile)) if profile.user_role.is_admin() => Ok(Self(user)),
            Ok(_) => {
                tracing::info!(user_id = %user.id, "Non-admin refused from admin panel");
                Err(AuthRejection::NotAdmin)
            }
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Admin role check failed");
                Err(AuthRejection::NotAdmin)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::{Request, header::LOCATION};

    #[test]
    fn test_sign_in_url_encodes_return_path() {
        assert_eq!(
            sign_in_url("/orders/7?from=mail"),
            "/auth/signin?redirect=%2Forders%2F7%3Ffrom%3Dmail"
        );
    }

    #[test]
    fn test_requested_path_prefers_original_uri() {
        let (mut parts, ()) = Request::builder()
            .uri("/7")
            .body(())
            .unwrap()
            .into_parts();
        parts
            .extensions
            .insert(OriginalUri("/orders/7".parse().unwrap()));
        assert_eq!(requested_path(&parts), "/orders/7");
    }

    #[test]
    fn test_rejection_responses() {
        let response = AuthRejection::RedirectToSignIn {
            return_to: "/wishlist".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "/auth/signin?redirect=%2Fwishlist"
        );

        let response = AuthRejection::NotAdmin.into_response();
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/");

        assert_eq!(
            AuthRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
