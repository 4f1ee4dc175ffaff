//! Checkout route handlers.
//!
//! Two flows share the same order writer ([`CheckoutService`]):
//!
//! - one step: `POST /checkout` with shipping details, for guests and users
//! - two step, signed in: shipping details first, then a demo card form
//!
//! No card data is processed or stored; the payment form only confirms intent.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{Cart, Email};

use crate::backend::{ShippingDetails, UserProfile};
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{OptionalAuth, PageContext, RequireAuth};
use crate::models::{CurrentUser, Flash};
use crate::services::{
    Buyer, CartService, CheckoutError, CheckoutService, PlacedOrder, combine_address,
};
use crate::state::AppState;

use super::cart::SummaryView;

/// Shipping form data.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ShippingForm {
    pub name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub pincode: String,
    pub mobile: String,
}

impl ShippingForm {
    /// Check required fields and build the profile columns.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first missing field.
    pub fn shipping_details(&self) -> std::result::Result<ShippingDetails, String> {
        let required = [
            ("Full name", &self.name),
            ("Address", &self.address),
            ("City", &self.city),
            ("Postal code", &self.pincode),
            ("Phone number", &self.mobile),
        ];
        if let Some((label, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(format!("{label} is required"));
        }
        Ok(ShippingDetails {
            user_name: self.name.trim().to_string(),
            user_address: combine_address(&self.address, &self.city),
            user_pincode: self.pincode.trim().to_string(),
            user_mobile: self.mobile.trim().to_string(),
        })
    }
}

/// Demo payment form. Only presence of the fields is checked.
#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaymentForm {
    pub card_name: String,
    pub card_number: String,
    pub expiry_date: String,
    pub cvv: String,
}

impl PaymentForm {
    fn is_complete(&self) -> bool {
        [&self.card_name, &self.card_number, &self.expiry_date, &self.cvv]
            .iter()
            .all(|value| !value.trim().is_empty())
    }
}

/// Success page query.
#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    pub order: Option<i64>,
}

/// Prefilled shipping form values.
#[derive(Debug, Clone, Default)]
pub struct ShippingFormView {
    pub name: String,
    pub email: String,
    pub address: String,
    pub pincode: String,
    pub mobile: String,
    pub email_locked: bool,
}

impl ShippingFormView {
    fn from_profile(profile: &UserProfile, user: &CurrentUser) -> Self {
        Self {
            name: if profile.user_name.is_empty() {
                user.name.clone()
            } else {
                profile.user_name.clone()
            },
            email: user.email.to_string(),
            address: profile.user_address.clone(),
            pincode: profile.user_pincode.clone(),
            mobile: profile.user_mobile.clone(),
            email_locked: true,
        }
    }
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub page: PageContext,
    pub form: ShippingFormView,
    pub summary: SummaryView,
    pub action: &'static str,
    pub submit_label: &'static str,
}

/// Payment page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub page: PageContext,
    pub ship_to: String,
    pub summary: SummaryView,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct SuccessTemplate {
    pub page: PageContext,
    pub order_no: i64,
}

async fn load_cart(
    state: &AppState,
    session: &Session,
    user: Option<&CurrentUser>,
) -> Result<Cart> {
    Ok(CartService::new(state.backend(), session, user).load().await?)
}

async fn empty_cart_redirect(session: &Session) -> Response {
    Flash::info("Your cart is empty").push(session).await;
    Redirect::to("/cart").into_response()
}

/// Display the shipping form, prefilled from the profile when signed in.
#[instrument(skip(state, session, page))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
) -> Result<Response> {
    let cart = load_cart(&state, &session, page.user.as_ref()).await?;
    if cart.is_empty() {
        return Ok(empty_cart_redirect(&session).await);
    }

    let (form, action, submit_label) = match &page.user {
        Some(user) => {
            let profile = state
                .backend()
                .as_user(&user.access_token)
                .users()
                .get(user.id)
                .await?;
            let form = profile.map_or_else(
                || ShippingFormView {
                    name: user.name.clone(),
                    email: user.email.to_string(),
                    email_locked: true,
                    ..ShippingFormView::default()
                },
                |p| ShippingFormView::from_profile(&p, user),
            );
            (form, "/checkout/shipping", "Continue to Payment")
        }
        None => (ShippingFormView::default(), "/checkout", "Place Order"),
    };

    Ok(CheckoutTemplate {
        page,
        form,
        summary: SummaryView::new(cart.item_count(), &cart.totals()),
        action,
        submit_label,
    }
    .into_response())
}

/// Place an order in one step.
#[instrument(skip(state, session, user, form))]
pub async fn place(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<ShippingForm>,
) -> Result<Response> {
    let shipping = match form.shipping_details() {
        Ok(shipping) => shipping,
        Err(message) => return Ok(back_to_checkout(&session, message).await),
    };

    let cart_service = CartService::new(state.backend(), &session, user.as_ref());
    let cart = cart_service.load().await?;

    let guest_email;
    let buyer = match &user {
        Some(user) => Buyer::SignedIn {
            user,
            shipping: Some(&shipping),
        },
        None => {
            guest_email = match Email::parse(&form.email) {
                Ok(email) => email,
                Err(_) => {
                    return Ok(back_to_checkout(&session, "Enter a valid email address").await);
                }
            };
            Buyer::Guest {
                email: &guest_email,
                shipping: &shipping,
            }
        }
    };

    let placed = match place_and_clear(&state, &cart_service, buyer, &cart).await {
        Ok(placed) => placed,
        Err(CheckoutError::EmptyCart) => return Ok(empty_cart_redirect(&session).await),
        Err(e) => return Ok(checkout_failed(&session, &e, "/checkout").await),
    };

    Ok(Redirect::to(&format!("/checkout/success?order={}", placed.order_no)).into_response())
}

/// Save shipping details and continue to the payment step.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn save_shipping(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ShippingForm>,
) -> Result<Response> {
    let shipping = match form.shipping_details() {
        Ok(shipping) => shipping,
        Err(message) => return Ok(back_to_checkout(&session, message).await),
    };

    state
        .backend()
        .privileged()
        .users()
        .ensure(user.id, Some(user.name.as_str()), &user.email)
        .await?;
    state
        .backend()
        .as_user(&user.access_token)
        .users()
        .update_shipping(user.id, &shipping)
        .await?;

    Ok(Redirect::to("/checkout/payment").into_response())
}

/// Display the demo payment form.
#[instrument(skip(state, session, page, user), fields(user_id = %user.id))]
pub async fn payment_page(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    page: PageContext,
) -> Result<Response> {
    let Some(profile) = state
        .backend()
        .as_user(&user.access_token)
        .users()
        .get(user.id)
        .await?
    else {
        return Ok(Redirect::to("/checkout").into_response());
    };
    if profile.user_cart.is_empty() {
        return Ok(empty_cart_redirect(&session).await);
    }
    if !profile.has_shipping_details() {
        Flash::info("Add your shipping details first").push(&session).await;
        return Ok(Redirect::to("/checkout").into_response());
    }

    Ok(PaymentTemplate {
        page,
        ship_to: format!("{}, {}", profile.user_name, profile.user_address),
        summary: SummaryView::new(profile.user_cart.item_count(), &profile.user_cart.totals()),
    }
    .into_response())
}

/// Place the order from the stored cart after the payment step.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn pay(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<PaymentForm>,
) -> Result<Response> {
    if !form.is_complete() {
        Flash::error("Please fill in all payment fields").push(&session).await;
        return Ok(Redirect::to("/checkout/payment").into_response());
    }

    let cart_service = CartService::new(state.backend(), &session, Some(&user));
    let cart = cart_service.load().await?;
    let buyer = Buyer::SignedIn {
        user: &user,
        shipping: None,
    };

    match place_and_clear(&state, &cart_service, buyer, &cart).await {
        Ok(placed) => {
            Flash::success(format!(
                "Order placed successfully. Your order #{} has been placed.",
                placed.order_no
            ))
            .push(&session)
            .await;
            Ok(Redirect::to("/orders").into_response())
        }
        Err(CheckoutError::EmptyCart) => Ok(empty_cart_redirect(&session).await),
        Err(e) => Ok(checkout_failed(&session, &e, "/checkout/payment").await),
    }
}

/// Order confirmation page.
pub async fn success(page: PageContext, Query(query): Query<SuccessQuery>) -> Response {
    match query.order {
        Some(order_no) => SuccessTemplate { page, order_no }.into_response(),
        None => Redirect::to("/").into_response(),
    }
}

async fn place_and_clear(
    state: &AppState,
    cart_service: &CartService<'_>,
    buyer: Buyer<'_>,
    cart: &Cart,
) -> std::result::Result<PlacedOrder, CheckoutError> {
    let placed = CheckoutService::new(state.backend())
        .place_order(buyer, cart)
        .await?;
    let order_no = placed.order_no.to_string();
    add_breadcrumb("checkout", "Order placed", Some(&[("order_no", order_no.as_str())]));
    // The order exists at this point; a stale cart is the lesser problem.
    if let Err(e) = cart_service.clear().await {
        tracing::error!(order_no = %placed.order_no, error = %e, "Failed to clear cart after checkout");
    }
    Ok(placed)
}

async fn back_to_checkout(session: &Session, message: impl Into<String>) -> Response {
    Flash::error(message).push(session).await;
    Redirect::to("/checkout").into_response()
}

async fn checkout_failed(session: &Session, error: &CheckoutError, back: &str) -> Response {
    tracing::error!(error = %error, "Checkout failed");
    Flash::error("We could not place your order. Please try again.")
        .push(session)
        .await;
    Redirect::to(back).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> ShippingForm {
        ShippingForm {
            name: " Ada Lovelace ".to_string(),
            email: "ada@example.com".to_string(),
            address: "12 Analytical Way".to_string(),
            city: "London".to_string(),
            pincode: "N1 9GU".to_string(),
            mobile: "0123456789".to_string(),
        }
    }

    #[test]
    fn test_shipping_details_combines_city_into_address() {
        let shipping = form().shipping_details().unwrap();
        assert_eq!(shipping.user_name, "Ada Lovelace");
        assert_eq!(shipping.user_address, "12 Analytical Way, London");
        assert_eq!(shipping.user_pincode, "N1 9GU");
    }

    #[test]
    fn test_shipping_details_reports_missing_field() {
        let mut incomplete = form();
        incomplete.city = "  ".to_string();
        assert_eq!(incomplete.shipping_details().unwrap_err(), "City is required");
    }

    #[test]
    fn test_payment_form_requires_every_field() {
        let mut payment = PaymentForm {
            card_name: "Ada".to_string(),
            card_number: "4242424242424242".to_string(),
            expiry_date: "12/30".to_string(),
            cvv: "123".to_string(),
        };
        assert!(payment.is_complete());
        payment.cvv.clear();
        assert!(!payment.is_complete());
    }
}
