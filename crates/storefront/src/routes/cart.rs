//! Cart route handlers.
//!
//! Cart changes are plain form posts that redirect back, so the pages work
//! without JavaScript. The cart itself lives in the session for guests and
//! in the profile for signed-in users (see [`CartService`]).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{Cart, CartItem, OrderTotals, ProductNo};

use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{OptionalAuth, PageContext};
use crate::models::Flash;
use crate::services::auth::safe_redirect;
use crate::services::cart::set_cart_count;
use crate::services::{CartError, CartService};
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Debug, Clone)]
pub struct CartLineView {
    pub no: i64,
    pub name: String,
    pub image: Option<String>,
    pub price: String,
    pub quantity: u32,
    pub line_total: String,
}

impl From<&CartItem> for CartLineView {
    fn from(item: &CartItem) -> Self {
        Self {
            no: item.product_no.as_i64(),
            name: item.p_description.clone(),
            image: item.product_image.clone().filter(|url| !url.is_empty()),
            price: item.product_price.display(),
            quantity: item.quantity,
            line_total: item.line_total().display(),
        }
    }
}

/// Order summary figures, formatted.
#[derive(Debug, Clone)]
pub struct SummaryView {
    pub item_count: u32,
    pub subtotal: String,
    pub tax: String,
    pub shipping: String,
    pub total: String,
}

impl SummaryView {
    #[must_use]
    pub fn new(item_count: u32, totals: &OrderTotals) -> Self {
        Self {
            item_count,
            subtotal: totals.subtotal.display(),
            tax: totals.tax.display(),
            shipping: totals.shipping.display(),
            total: totals.total.display(),
        }
    }
}

/// Cart display data for templates.
#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub summary: SummaryView,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items().iter().map(CartLineView::from).collect(),
            summary: SummaryView::new(cart.item_count(), &cart.totals()),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_no: i64,
    pub quantity: Option<i64>,
    pub return_to: Option<String>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_no: i64,
    pub quantity: i64,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_no: i64,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub items: Vec<CartLineView>,
    pub summary: SummaryView,
}

/// Clamp a submitted quantity into the range a cart line can hold.
fn form_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity.max(0)).unwrap_or(u32::MAX)
}

/// Display the cart page.
#[instrument(skip(state, session, page))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    mut page: PageContext,
) -> Result<impl IntoResponse> {
    let cart = CartService::new(state.backend(), &session, page.user.as_ref())
        .load()
        .await?;

    // Keep the badge honest if the stored cart changed elsewhere.
    if page.cart_count != cart.item_count() {
        page.cart_count = cart.item_count();
        set_cart_count(&session, page.cart_count).await;
    }

    let CartView { items, summary } = CartView::from(&cart);
    Ok(CartShowTemplate {
        page,
        items,
        summary,
    })
}

/// Add a product to the cart, then return to the page the form was on.
#[instrument(skip(state, session, user, form), fields(product_no = form.product_no))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let product_no = ProductNo::new(form.product_no);
    let quantity = form_quantity(form.quantity.unwrap_or(1)).max(1);
    let back = safe_redirect(form.return_to.as_deref().or(Some("/cart")));

    let result = CartService::new(state.backend(), &session, user.as_ref())
        .add(product_no, quantity)
        .await;

    match result {
        Ok(cart) => {
            let name = cart
                .items()
                .iter()
                .find(|item| item.product_no == product_no)
                .map_or("Item", |item| item.p_description.as_str());
            let product = product_no.to_string();
            add_breadcrumb("cart", "Added to cart", Some(&[("product_no", product.as_str())]));
            Flash::success(format!("{name} added to your cart")).push(&session).await;
        }
        Err(CartError::OutOfStock(_)) => {
            Flash::error("Sorry, this product is out of stock").push(&session).await;
        }
        Err(CartError::ProductNotFound(_)) => {
            Flash::error("That product is no longer available").push(&session).await;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to(&back).into_response())
}

/// Set a line's quantity; anything below 1 removes the line.
#[instrument(skip(state, session, user, form), fields(product_no = form.product_no))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<UpdateCartForm>,
) -> Result<Redirect> {
    CartService::new(state.backend(), &session, user.as_ref())
        .update_quantity(ProductNo::new(form.product_no), form_quantity(form.quantity))
        .await?;
    Ok(Redirect::to("/cart"))
}

/// Remove a line from the cart.
#[instrument(skip(state, session, user, form), fields(product_no = form.product_no))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Redirect> {
    CartService::new(state.backend(), &session, user.as_ref())
        .remove(ProductNo::new(form.product_no))
        .await?;
    Flash::info("Item removed from your cart").push(&session).await;
    Ok(Redirect::to("/cart"))
}
