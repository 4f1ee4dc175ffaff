//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::filters;
use crate::middleware::PageContext;
use crate::state::AppState;

use super::products::ProductCardView;

/// Number of products shown on the home page.
pub const FEATURED_PRODUCT_COUNT: usize = 8;

/// A category tile linking to a filtered listing.
#[derive(Debug, Clone, Copy)]
pub struct CategoryTile {
    pub name: &'static str,
    pub product_type: &'static str,
}

/// The four categories featured on the home page.
pub const FEATURED_CATEGORIES: [CategoryTile; 4] = [
    CategoryTile {
        name: "Electronics",
        product_type: "Electronics",
    },
    CategoryTile {
        name: "Clothing",
        product_type: "Clothing",
    },
    CategoryTile {
        name: "Home & Kitchen",
        product_type: "Home",
    },
    CategoryTile {
        name: "Accessories",
        product_type: "Accessories",
    },
];

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub categories: Vec<CategoryTile>,
    pub products: Vec<ProductCardView>,
    pub return_to: String,
}

/// Display the home page.
///
/// A backend outage shows an empty product section rather than an error page.
#[instrument(skip(state, page))]
pub async fn home(State(state): State<AppState>, page: PageContext) -> impl IntoResponse {
    let products = match state
        .backend()
        .anon()
        .products()
        .featured(FEATURED_PRODUCT_COUNT)
        .await
    {
        Ok(products) => products.iter().map(ProductCardView::from).collect(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch featured products");
            Vec::new()
        }
    };

    HomeTemplate {
        page,
        categories: FEATURED_CATEGORIES.to_vec(),
        products,
        return_to: "/".to_string(),
    }
}
