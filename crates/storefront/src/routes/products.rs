//! Product listing and detail pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::ProductNo;

use crate::backend::{PriceBand, Product, ProductFilter};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::PageContext;
use crate::state::AppState;

/// Most units offered in the quantity picker.
const MAX_PICKER_QUANTITY: i64 = 10;

/// Product card data for templates.
#[derive(Debug, Clone)]
pub struct ProductCardView {
    pub no: i64,
    pub name: String,
    pub price: String,
    pub image: Option<String>,
    pub product_type: String,
    pub is_hot: bool,
    pub in_stock: bool,
}

impl From<&Product> for ProductCardView {
    fn from(product: &Product) -> Self {
        Self {
            no: product.product_no.as_i64(),
            name: product.p_description.clone(),
            price: product.product_price.display(),
            image: product.product_image.clone().filter(|url| !url.is_empty()),
            product_type: product.product_type.clone(),
            is_hot: product.product_sales.eq_ignore_ascii_case("hot"),
            in_stock: product.in_stock(),
        }
    }
}

/// One radio option in the filter sidebar.
#[derive(Debug, Clone)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Listing query parameters. Blank values mean "no filter".
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    #[serde(rename = "type")]
    pub product_type: Option<String>,
    pub price: Option<String>,
}

impl ListingQuery {
    /// Turn the raw query into a filter, ignoring unknown price bands.
    #[must_use]
    pub fn to_filter(&self) -> ProductFilter {
        ProductFilter {
            product_type: self
                .product_type
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from),
            price: self.price.as_deref().and_then(|p| p.parse().ok()),
        }
    }
}

/// Product listing template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub products: Vec<ProductCardView>,
    pub type_options: Vec<FilterOption>,
    pub price_options: Vec<FilterOption>,
    pub selected_type: String,
    pub selected_price: String,
    pub return_to: String,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub product: ProductCardView,
    pub details: String,
    pub stock_label: String,
    pub max_quantity: i64,
    pub in_wishlist: bool,
    pub return_to: String,
}

/// Availability text for the detail page.
#[must_use]
pub fn stock_label(quantity_available: i64) -> String {
    if quantity_available > 0 {
        format!("In Stock ({quantity_available} available)")
    } else {
        "Out of Stock".to_string()
    }
}

/// Product listing with category and price filters.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<ListingQuery>,
) -> Result<impl IntoResponse> {
    let filter = query.to_filter();
    let products = state.backend().anon().products();

    let (listed, types) = tokio::join!(products.list(&filter), products.types());
    let listed = listed?;
    let types = types.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load product types");
        Vec::new()
    });

    let selected_type = filter.product_type.clone().unwrap_or_default();
    let selected_price = filter
        .price
        .map(|band| band.as_param().to_string())
        .unwrap_or_default();

    let type_options = types
        .into_iter()
        .map(|t| FilterOption {
            selected: t == selected_type,
            label: t.clone(),
            value: t,
        })
        .collect();
    let price_options = PriceBand::ALL
        .iter()
        .map(|band| FilterOption {
            value: band.as_param().to_string(),
            label: band.label().to_string(),
            selected: filter.price == Some(*band),
        })
        .collect();

    Ok(ProductsIndexTemplate {
        page,
        products: listed.iter().map(ProductCardView::from).collect(),
        type_options,
        price_options,
        selected_type,
        selected_price,
        return_to: "/products".to_string(),
    })
}

/// Product detail page.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    Path(product_no): Path<i64>,
) -> Result<Response> {
    let product_no = ProductNo::new(product_no);
    let product = state
        .backend()
        .anon()
        .products()
        .get(product_no)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_no}")))?;

    let in_wishlist = match &page.user {
        Some(user) => state
            .backend()
            .as_user(&user.access_token)
            .users()
            .get(user.id)
            .await
            .ok()
            .flatten()
            .is_some_and(|profile| profile.user_wish_list.contains(product_no)),
        None => false,
    };

    Ok(ProductShowTemplate {
        page,
        details: product.p_details.clone(),
        stock_label: stock_label(product.quantity_available),
        max_quantity: product.quantity_available.clamp(1, MAX_PICKER_QUANTITY),
        in_wishlist,
        return_to: format!("/products/{product_no}"),
        product: ProductCardView::from(&product),
    }
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_label() {
        assert_eq!(stock_label(15), "In Stock (15 available)");
        assert_eq!(stock_label(0), "Out of Stock");
    }

    #[test]
    fn test_listing_query_ignores_blank_and_unknown_values() {
        let query = ListingQuery {
            product_type: Some("  ".to_string()),
            price: Some("cheap".to_string()),
        };
        assert_eq!(query.to_filter(), ProductFilter::default());

        let query = ListingQuery {
            product_type: Some("Home".to_string()),
            price: Some("50-100".to_string()),
        };
        let filter = query.to_filter();
        assert_eq!(filter.product_type.as_deref(), Some("Home"));
        assert_eq!(filter.price, Some(PriceBand::From50To100));
    }
}
