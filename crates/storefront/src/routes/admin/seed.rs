//! Store setup: sample catalog and self-promotion to admin.
//!
//! The seed page is open to any signed-in user so that the first account of
//! a fresh store can promote itself when `STOREFRONT_ALLOW_SELF_PROMOTE` is
//! on. Replacing the catalog always requires an admin.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
};
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::UserRole;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin, RequireAuth};
use crate::models::Flash;
use crate::services::auth::set_session_role;
use crate::services::catalog::sample_products;
use crate::state::AppState;

/// Seed page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/seed.html")]
pub struct SeedTemplate {
    pub page: PageContext,
    pub sample_count: usize,
    pub allow_self_promote: bool,
}

/// Seed page.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    page: PageContext,
) -> impl IntoResponse {
    SeedTemplate {
        page,
        sample_count: sample_products().len(),
        allow_self_promote: state.config().allow_self_promote,
    }
}

/// Replace the catalog with the sample products.
#[instrument(skip(state, session, admin), fields(user_id = %admin.id))]
pub async fn seed_products(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Redirect> {
    let products = sample_products();
    let flash = match state
        .backend()
        .privileged()
        .products()
        .replace_catalog(&products)
        .await
    {
        Ok(count) => {
            tracing::info!(count, "Catalog seeded");
            Flash::success(format!("Successfully added {count} sample products."))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to seed catalog");
            Flash::error("Failed to seed database.")
        }
    };
    flash.push(&session).await;
    Ok(Redirect::to("/admin/seed"))
}

/// Give the signed-in user the admin role.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn make_admin(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
) -> Result<Redirect> {
    if !state.config().allow_self_promote {
        tracing::warn!("Self-promotion attempted while disabled");
        return Err(AppError::Forbidden("self-promotion is disabled".to_string()));
    }

    let users = state.backend().privileged().users();
    users
        .ensure(user.id, Some(user.name.as_str()), &user.email)
        .await?;
    users.set_role(user.id, UserRole::Admin).await?;
    set_session_role(&session, user, UserRole::Admin).await?;

    tracing::info!("User promoted to admin");
    Flash::success("Your account has been upgraded to admin.")
        .push(&session)
        .await;
    Ok(Redirect::to("/admin"))
}
