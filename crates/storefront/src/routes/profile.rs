//! Profile route handlers (signed-in users only).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::ShippingDetails;
use crate::error::Result;
use crate::filters;
use crate::middleware::{PageContext, RequireAuth};
use crate::models::{Flash, session_keys};
use crate::state::AppState;

use super::orders::OrderRowView;
use super::signed_in_profile;

/// Orders shown on the profile page.
const RECENT_ORDER_COUNT: usize = 5;

/// Profile form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub name: String,
    pub address: String,
    pub pincode: String,
    pub mobile: String,
}

impl ProfileForm {
    fn shipping_details(&self) -> ShippingDetails {
        ShippingDetails {
            user_name: self.name.trim().to_string(),
            user_address: self.address.trim().to_string(),
            user_pincode: self.pincode.trim().to_string(),
            user_mobile: self.mobile.trim().to_string(),
        }
    }
}

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "profile/show.html")]
pub struct ProfileTemplate {
    pub page: PageContext,
    pub name: String,
    pub email: String,
    pub address: String,
    pub pincode: String,
    pub mobile: String,
    pub role: String,
    pub recent_orders: Vec<OrderRowView>,
}

/// Display the profile form and the most recent orders.
#[instrument(skip(state, user, page), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let profile = signed_in_profile(&state, &user).await?;
    let recent_orders = match state
        .backend()
        .as_user(&user.access_token)
        .orders()
        .list_for_user(user.id)
        .await
    {
        Ok(orders) => orders
            .iter()
            .take(RECENT_ORDER_COUNT)
            .map(OrderRowView::from)
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load recent orders");
            Vec::new()
        }
    };

    Ok(ProfileTemplate {
        page,
        name: profile.user_name,
        email: if profile.user_email.is_empty() {
            user.email.to_string()
        } else {
            profile.user_email
        },
        address: profile.user_address,
        pincode: profile.user_pincode,
        mobile: profile.user_mobile,
        role: profile.user_role.to_string(),
        recent_orders,
    })
}

/// Update name and contact details. The email address is managed by the auth service.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(mut user): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect> {
    let details = form.shipping_details();
    if details.user_name.is_empty() {
        Flash::error("Full name is required").push(&session).await;
        return Ok(Redirect::to("/profile"));
    }

    signed_in_profile(&state, &user).await?;
    state
        .backend()
        .as_user(&user.access_token)
        .users()
        .update_shipping(user.id, &details)
        .await?;

    user.name = details.user_name;
    session.insert(session_keys::CURRENT_USER, &user).await?;

    Flash::success("Your profile has been updated successfully.")
        .push(&session)
        .await;
    Ok(Redirect::to("/profile"))
}
