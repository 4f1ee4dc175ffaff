//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Home page
//! GET  /health                    - Liveness check
//! GET  /health/ready              - Readiness check
//!
//! # Catalog
//! GET  /products                  - Product listing (?type=&price=)
//! GET  /products/{no}             - Product detail
//!
//! # Cart
//! GET  /cart                      - Cart page
//! POST /cart/add                  - Add to cart, redirect back
//! POST /cart/update               - Set line quantity
//! POST /cart/remove               - Remove line
//!
//! # Checkout
//! GET  /checkout                  - Shipping form
//! POST /checkout                  - Place order (guest or signed in)
//! POST /checkout/shipping         - Save shipping details (signed in)
//! GET  /checkout/payment          - Demo card form (signed in)
//! POST /checkout/payment          - Place order from server cart (signed in)
//! GET  /checkout/success          - Confirmation (?order=N)
//!
//! # Account (requires sign-in)
//! GET  /wishlist                  - Saved products
//! POST /wishlist/toggle           - Save or unsave
//! POST /wishlist/remove           - Unsave
//! POST /wishlist/move-to-cart     - Move one unit to the cart
//! GET  /orders                    - Order history
//! GET  /orders/{no}               - Order detail
//! GET  /profile                   - Profile form
//! POST /profile                   - Update profile
//!
//! # Auth
//! GET  /auth/signin (/auth/login) - Sign-in page
//! POST /auth/signin               - Sign in
//! GET  /auth/signup               - Sign-up page
//! POST /auth/signup               - Sign up
//! GET  /auth/forgot-password      - Recovery page
//! POST /auth/forgot-password      - Send recovery email
//! POST /auth/logout               - Sign out
//!
//! # API
//! POST /api/create-user-profile   - Ensure the caller's profile row
//!
//! # Admin (requires admin role)
//! GET  /admin                     - Dashboard
//! GET  /admin/products            - Product table
//! GET  /admin/products/new        - New product form
//! POST /admin/products            - Create product
//! GET  /admin/products/{no}/edit  - Edit form
//! POST /admin/products/{no}       - Update product
//! POST /admin/products/{no}/delete - Delete product
//! GET  /admin/seed                - Setup page (any signed-in user)
//! POST /admin/seed/products       - Replace catalog with samples
//! POST /admin/seed/make-admin     - Self-promotion (when enabled)
//! ```

pub mod admin;
pub mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod health;
pub mod home;
pub mod orders;
pub mod products;
pub mod profile;
pub mod wishlist;

use axum::{
    Router,
    routing::{get, post},
};

use crate::backend::UserProfile;
use crate::error::Result;
use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::models::CurrentUser;
use crate::state::AppState;

/// Load the signed-in user's profile row, creating it if it is missing.
///
/// Accounts created while email confirmation was pending may not have a row
/// yet; the privileged client creates it with the session's name and email.
pub(crate) async fn signed_in_profile(
    state: &AppState,
    user: &CurrentUser,
) -> Result<UserProfile> {
    if let Some(profile) = state
        .backend()
        .as_user(&user.access_token)
        .users()
        .get(user.id)
        .await?
    {
        return Ok(profile);
    }

    let (profile, created) = state
        .backend()
        .privileged()
        .users()
        .ensure(user.id, Some(user.name.as_str()), &user.email)
        .await?;
    if created {
        tracing::info!(user_id = %user.id, "Created missing profile");
    }
    Ok(profile)
}

/// Create the auth routes router.
///
/// Form posts share one per-client-IP rate limit; the pages themselves are not limited.
pub fn auth_routes() -> Router<AppState> {
    let limiter = auth_rate_limiter();

    Router::new()
        .route(
            "/signin",
            post(auth::signin)
                .layer(limiter.clone())
                .get(auth::signin_page),
        )
        .route(
            "/login",
            post(auth::signin)
                .layer(limiter.clone())
                .get(auth::signin_page),
        )
        .route(
            "/signup",
            post(auth::signup)
                .layer(limiter.clone())
                .get(auth::signup_page),
        )
        .route(
            "/forgot-password",
            post(auth::forgot_password)
                .layer(limiter)
                .get(auth::forgot_password_page),
        )
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{no}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::place))
        .route("/shipping", post(checkout::save_shipping))
        .route(
            "/payment",
            get(checkout::payment_page).post(checkout::pay),
        )
        .route("/success", get(checkout::success))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::show))
        .route("/toggle", post(wishlist::toggle))
        .route("/remove", post(wishlist::remove))
        .route("/move-to-cart", post(wishlist::move_to_cart))
}

/// Create the order history routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{no}", get(orders::show))
}

/// Create the JSON API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/create-user-profile", post(api::create_user_profile))
        .layer(api_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/wishlist", wishlist_routes())
        .nest("/orders", order_routes())
        .route("/profile", get(profile::show).post(profile::update))
        .nest("/auth", auth_routes())
        .nest("/api", api_routes())
        .nest("/admin", admin::routes())
}
