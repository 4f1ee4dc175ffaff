//! Catalog seeding.
//!
//! Replaces every row of `product_master` with either the built-in sample
//! catalog or the products listed in a YAML file:
//!
//! ```yaml
//! - product_no: 1
//!   product_price: 999.99
//!   quantity_available: 15
//!   product_type: Electronics
//!   p_description: Premium Laptop
//!   product_sales: Hot
//!   p_details: High-performance laptop.
//!   product_image: https://images.unsplash.com/photo-1496181133206-80ce9b88a853?q=80&w=800
//! ```

use std::collections::HashSet;
use std::path::Path;

use tracing::{error, info};

use bazaar_storefront::backend::{BackendClient, Product};
use bazaar_storefront::config::BackendConfig;
use bazaar_storefront::services::catalog::sample_products;

/// Check a catalog before it replaces the live one.
///
/// Returns one message per problem; an empty list means the catalog is usable.
#[must_use]
pub fn validate_catalog(products: &[Product]) -> Vec<String> {
    let mut errors = Vec::new();
    if products.is_empty() {
        errors.push("catalog has no products".to_string());
    }

    let mut seen = HashSet::new();
    for product in products {
        let no = product.product_no;
        if no.as_i64() <= 0 {
            errors.push(format!("product {no}: product_no must be positive"));
        }
        if !seen.insert(no) {
            errors.push(format!("product {no}: duplicate product_no"));
        }
        if product.p_description.trim().is_empty() {
            errors.push(format!("product {no}: p_description is required"));
        }
        if product.quantity_available < 0 {
            errors.push(format!("product {no}: quantity_available cannot be negative"));
        }
        if product.product_price.amount().is_sign_negative() {
            errors.push(format!("product {no}: product_price cannot be negative"));
        }
    }
    errors
}

/// Load the products to seed.
async fn load_products(file_path: Option<&str>) -> Result<Vec<Product>, Box<dyn std::error::Error>> {
    let Some(file_path) = file_path else {
        info!("Using built-in sample catalog");
        return Ok(sample_products());
    };

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");
    let content = tokio::fs::read_to_string(path).await?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Replace the catalog.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation, backend
/// settings are missing, or the backend rejects the write.
pub async fn products(file_path: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Validate before touching the backend
    let products = load_products(file_path).await?;
    let errors = validate_catalog(&products);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let backend = BackendClient::new(&BackendConfig::from_env()?);
    let count = backend
        .privileged()
        .products()
        .replace_catalog(&products)
        .await?;

    info!("Seeding complete!");
    info!("  Products inserted: {count}");
    Ok(())
}
