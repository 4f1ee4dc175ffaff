//! Admin panel route handlers.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin), which
//! re-reads the role from the profile row. Once the role is confirmed, reads
//! and writes go through the privileged client so they are not limited by
//! row-level security.

pub mod dashboard;
pub mod products;
pub mod seed;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the admin routes router (mounted at `/admin`).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::dashboard))
        .route("/products", get(products::index).post(products::create))
        .route("/products/new", get(products::new))
        .route("/products/{no}", post(products::update))
        .route("/products/{no}/edit", get(products::edit))
        .route("/products/{no}/delete", post(products::delete))
        .route("/seed", get(seed::show))
        .route("/seed/products", post(seed::seed_products))
        .route("/seed/make-admin", post(seed::make_admin))
}
