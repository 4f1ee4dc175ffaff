//! Wishlist route handlers (signed-in users only).

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

use bazaar_core::{ProductNo, Toggled, WishlistItem};

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{PageContext, RequireAuth};
use crate::models::Flash;
use crate::services::auth::safe_redirect;
use crate::services::cart::set_cart_count;
use crate::state::AppState;

use super::signed_in_profile;

/// Wishlist entry display data.
#[derive(Debug, Clone)]
pub struct WishlistItemView {
    pub no: i64,
    pub name: String,
    pub price: String,
    pub image: Option<String>,
}

impl From<&WishlistItem> for WishlistItemView {
    fn from(item: &WishlistItem) -> Self {
        Self {
            no: item.product_no.as_i64(),
            name: item.p_description.clone(),
            price: item.product_price.display(),
            image: item.product_image.clone().filter(|url| !url.is_empty()),
        }
    }
}

/// Form naming one product.
#[derive(Debug, Deserialize)]
pub struct WishlistForm {
    pub product_no: i64,
    pub return_to: Option<String>,
}

/// Wishlist page template.
#[derive(Template, WebTemplate)]
#[template(path = "wishlist/show.html")]
pub struct WishlistTemplate {
    pub page: PageContext,
    pub items: Vec<WishlistItemView>,
}

/// Display the wishlist, creating the profile on first visit.
#[instrument(skip(state, user, page), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let profile = signed_in_profile(&state, &user).await?;
    Ok(WishlistTemplate {
        page,
        items: profile
            .user_wish_list
            .items()
            .iter()
            .map(WishlistItemView::from)
            .collect(),
    })
}

/// Save or unsave a product.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id, product_no = form.product_no))]
pub async fn toggle(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<WishlistForm>,
) -> Result<Redirect> {
    let product_no = ProductNo::new(form.product_no);
    let product = state
        .backend()
        .anon()
        .products()
        .get(product_no)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_no}")))?;

    let mut wishlist = signed_in_profile(&state, &user).await?.user_wish_list;
    let toggled = wishlist.toggle(product.snapshot());
    state
        .backend()
        .as_user(&user.access_token)
        .users()
        .save_wishlist(user.id, &wishlist)
        .await?;

    let message = match toggled {
        Toggled::Added => format!("{} added to your wishlist", product.p_description),
        Toggled::Removed => format!("{} removed from your wishlist", product.p_description),
    };
    Flash::success(message).push(&session).await;

    Ok(Redirect::to(&safe_redirect(
        form.return_to.as_deref().or(Some("/wishlist")),
    )))
}

/// Remove a saved product.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id, product_no = form.product_no))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<WishlistForm>,
) -> Result<Redirect> {
    let mut wishlist = signed_in_profile(&state, &user).await?.user_wish_list;
    if wishlist.remove(ProductNo::new(form.product_no)) {
        state
            .backend()
            .as_user(&user.access_token)
            .users()
            .save_wishlist(user.id, &wishlist)
            .await?;
        Flash::info("The item has been removed from your wishlist.")
            .push(&session)
            .await;
    }
    Ok(Redirect::to("/wishlist"))
}

/// Move a saved product into the cart (one unit).
///
/// Cart and wishlist are written in one request so the product is never in
/// neither list.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id, product_no = form.product_no))]
pub async fn move_to_cart(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<WishlistForm>,
) -> Result<Redirect> {
    let profile = signed_in_profile(&state, &user).await?;
    let mut cart = profile.user_cart;
    let mut wishlist = profile.user_wish_list;

    if wishlist.move_to_cart(ProductNo::new(form.product_no), &mut cart) {
        state
            .backend()
            .as_user(&user.access_token)
            .users()
            .save_cart_and_wishlist(user.id, &cart, &wishlist)
            .await?;
        set_cart_count(&session, cart.item_count()).await;
        Flash::success("The item has been moved to your cart.")
            .push(&session)
            .await;
    }
    Ok(Redirect::to("/wishlist"))
}
