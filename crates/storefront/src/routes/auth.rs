//! Authentication route handlers.
//!
//! Sign-in, sign-up, sign-out, and password recovery through the hosted auth
//! service. Failed form posts re-render the form with the error and the
//! values the visitor typed (never the password).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::PageContext;
use crate::models::Flash;
use crate::services::auth::safe_redirect;
use crate::services::{AuthError, AuthService, SignUpResult};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Sign-in form data.
#[derive(Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub redirect: Option<String>,
}

/// Sign-up form data.
#[derive(Deserialize)]
pub struct SignUpForm {
    #[serde(default)]
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub password_confirm: Option<String>,
    #[serde(default)]
    pub redirect: Option<String>,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Where to go after signing in.
#[derive(Debug, Default, Deserialize)]
pub struct RedirectQuery {
    pub redirect: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Sign-in page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signin.html")]
pub struct SignInTemplate {
    pub page: PageContext,
    pub error: Option<String>,
    pub email: String,
    pub redirect: String,
}

/// Sign-up page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignUpTemplate {
    pub page: PageContext,
    pub error: Option<String>,
    pub name: String,
    pub email: String,
    pub redirect: String,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub page: PageContext,
    pub error: Option<String>,
    pub sent_to: Option<String>,
}

/// Message for a failed sign-in or sign-up, or `None` for server faults.
fn form_error(err: &AuthError) -> Option<String> {
    match err {
        AuthError::InvalidCredentials => Some("Invalid email or password".to_string()),
        AuthError::InvalidEmail(_) => Some("Enter a valid email address".to_string()),
        AuthError::UserAlreadyExists => {
            Some("An account with this email already exists".to_string())
        }
        AuthError::WeakPassword(msg) | AuthError::Rejected(msg) => Some(msg.clone()),
        _ => None,
    }
}

// =============================================================================
// Sign In
// =============================================================================

/// Display the sign-in page.
pub async fn signin_page(page: PageContext, Query(query): Query<RedirectQuery>) -> Response {
    let redirect = safe_redirect(query.redirect.as_deref());
    if page.is_signed_in() {
        return Redirect::to(&redirect).into_response();
    }
    SignInTemplate {
        page,
        error: None,
        email: String::new(),
        redirect,
    }
    .into_response()
}

/// Handle sign-in form submission.
#[instrument(skip(state, session, page, form))]
pub async fn signin(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<SignInForm>,
) -> Result<Response> {
    let redirect = safe_redirect(form.redirect.as_deref());
    match AuthService::new(state.backend())
        .sign_in(&session, &form.email, &form.password)
        .await
    {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "Signed in");
            Flash::success("You have been signed in successfully.")
                .push(&session)
                .await;
            Ok(Redirect::to(&redirect).into_response())
        }
        Err(e) => match form_error(&e) {
            Some(message) => {
                tracing::info!(error = %e, "Sign in failed");
                Ok((
                    StatusCode::UNAUTHORIZED,
                    SignInTemplate {
                        page,
                        error: Some(message),
                        email: form.email,
                        redirect,
                    },
                )
                    .into_response())
            }
            None => Err(AppError::Auth(e)),
        },
    }
}

// =============================================================================
// Sign Up
// =============================================================================

/// Display the sign-up page.
pub async fn signup_page(page: PageContext, Query(query): Query<RedirectQuery>) -> Response {
    let redirect = safe_redirect(query.redirect.as_deref());
    if page.is_signed_in() {
        return Redirect::to(&redirect).into_response();
    }
    SignUpTemplate {
        page,
        error: None,
        name: String::new(),
        email: String::new(),
        redirect,
    }
    .into_response()
}

/// Handle sign-up form submission.
#[instrument(skip(state, session, page, form))]
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<SignUpForm>,
) -> Result<Response> {
    let redirect = safe_redirect(form.redirect.as_deref());
    let rerender = |page: PageContext, form: SignUpForm, message: String| {
        (
            StatusCode::BAD_REQUEST,
            SignUpTemplate {
                page,
                error: Some(message),
                name: form.name,
                email: form.email,
                redirect: redirect.clone(),
            },
        )
            .into_response()
    };

    if form
        .password_confirm
        .as_deref()
        .is_some_and(|confirm| confirm != form.password)
    {
        return Ok(rerender(page, form, "Passwords do not match".to_string()));
    }

    match AuthService::new(state.backend())
        .sign_up(&session, &form.name, &form.email, &form.password)
        .await
    {
        Ok(SignUpResult::SignedIn(user)) => {
            tracing::info!(user_id = %user.id, "Signed up");
            Flash::success("Welcome! Your account has been created.")
                .push(&session)
                .await;
            Ok(Redirect::to(&redirect).into_response())
        }
        Ok(SignUpResult::ConfirmationRequired) => {
            Flash::info("Check your email to confirm your account, then sign in.")
                .push(&session)
                .await;
            Ok(Redirect::to(&crate::middleware::sign_in_url(&redirect)).into_response())
        }
        Err(e) => match form_error(&e) {
            Some(message) => Ok(rerender(page, form, message)),
            None => Err(AppError::Auth(e)),
        },
    }
}

// =============================================================================
// Sign Out
// =============================================================================

/// Sign out and return to the home page.
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Redirect> {
    AuthService::new(state.backend()).sign_out(&session).await?;
    Flash::info("You have been signed out.").push(&session).await;
    Ok(Redirect::to("/"))
}

// =============================================================================
// Password Recovery
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page(page: PageContext) -> impl IntoResponse {
    ForgotPasswordTemplate {
        page,
        error: None,
        sent_to: None,
    }
}

/// Send a password recovery email.
///
/// The confirmation is shown whether or not an account exists.
#[instrument(skip(state, page, form))]
pub async fn forgot_password(
    State(state): State<AppState>,
    page: PageContext,
    Form(form): Form<ForgotPasswordForm>,
) -> Result<Response> {
    let redirect_to = format!(
        "{}/auth/signin",
        state.config().base_url.trim_end_matches('/')
    );
    match AuthService::new(state.backend())
        .recover(&form.email, &redirect_to)
        .await
    {
        Ok(()) => Ok(ForgotPasswordTemplate {
            page,
            error: None,
            sent_to: Some(form.email.trim().to_string()),
        }
        .into_response()),
        Err(e) => match form_error(&e) {
            Some(message) => Ok((
                StatusCode::BAD_REQUEST,
                ForgotPasswordTemplate {
                    page,
                    error: Some(message),
                    sent_to: None,
                },
            )
                .into_response()),
            None => Err(AppError::Auth(e)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_error_hides_server_faults() {
        assert_eq!(
            form_error(&AuthError::InvalidCredentials).as_deref(),
            Some("Invalid email or password")
        );
        assert!(form_error(&AuthError::SessionExpired).is_none());
    }
}
