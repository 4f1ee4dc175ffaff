//! Product management route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{Price, ProductNo};

use crate::backend::{Product, ProductFilter, ProductInput};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin};
use crate::models::Flash;
use crate::routes::products::FilterOption;
use crate::state::AppState;

/// Sales labels offered by the form.
const SALES_LABELS: [&str; 3] = ["Hot", "Regular", "Seasonal"];

/// Product table row.
#[derive(Debug, Clone)]
pub struct ProductRowView {
    pub no: i64,
    pub name: String,
    pub product_type: String,
    pub price: String,
    pub stock: i64,
}

impl From<&Product> for ProductRowView {
    fn from(product: &Product) -> Self {
        Self {
            no: product.product_no.as_i64(),
            name: product.p_description.clone(),
            product_type: product.product_type.clone(),
            price: product.product_price.display(),
            stock: product.quantity_available,
        }
    }
}

/// Product form data. Numbers arrive as text so bad input can be reported.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub p_description: String,
    pub product_price: String,
    pub quantity_available: String,
    pub product_type: String,
    pub product_sales: String,
    pub p_details: String,
    pub product_image: String,
}

impl ProductForm {
    /// Validate the form into writable columns.
    ///
    /// # Errors
    ///
    /// Returns the first problem found, worded for the form.
    pub fn to_input(&self) -> std::result::Result<ProductInput, String> {
        let name = self.p_description.trim();
        if name.is_empty() {
            return Err("Name is required".to_string());
        }
        let price = Price::parse(&self.product_price).map_err(|e| format!("Price: {e}"))?;
        let quantity = self
            .quantity_available
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|q| *q >= 0)
            .ok_or_else(|| "Stock must be a whole number of zero or more".to_string())?;
        let image = self.product_image.trim();

        Ok(ProductInput {
            product_price: price.round_to_cents(),
            quantity_available: quantity,
            product_type: self.product_type.trim().to_string(),
            p_description: name.to_string(),
            product_sales: self.product_sales.trim().to_string(),
            p_details: self.p_details.trim().to_string(),
            product_image: (!image.is_empty()).then(|| image.to_string()),
        })
    }
}

impl From<&Product> for ProductForm {
    fn from(product: &Product) -> Self {
        Self {
            p_description: product.p_description.clone(),
            product_price: product.product_price.amount().to_string(),
            quantity_available: product.quantity_available.to_string(),
            product_type: product.product_type.clone(),
            product_sales: product.product_sales.clone(),
            p_details: product.p_details.clone(),
            product_image: product.product_image.clone().unwrap_or_default(),
        }
    }
}

/// Product table template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub products: Vec<ProductRowView>,
}

/// Create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products/form.html")]
pub struct ProductFormTemplate {
    pub page: PageContext,
    pub heading: String,
    pub action: String,
    pub form: ProductForm,
    pub sales_options: Vec<FilterOption>,
    pub error: Option<String>,
}

/// Sales label choices with the form's current label selected.
fn sales_options(current: &str) -> Vec<FilterOption> {
    SALES_LABELS
        .iter()
        .map(|label| FilterOption {
            value: (*label).to_string(),
            label: (*label).to_string(),
            selected: current.eq_ignore_ascii_case(label),
        })
        .collect()
}

impl ProductFormTemplate {
    fn for_new(page: PageContext, form: ProductForm, error: Option<String>) -> Self {
        Self {
            page,
            heading: "Add Product".to_string(),
            action: "/admin/products".to_string(),
            sales_options: sales_options(&form.product_sales),
            form,
            error,
        }
    }

    fn for_edit(
        page: PageContext,
        product_no: ProductNo,
        form: ProductForm,
        error: Option<String>,
    ) -> Self {
        Self {
            page,
            heading: format!("Edit Product #{product_no}"),
            action: format!("/admin/products/{product_no}"),
            sales_options: sales_options(&form.product_sales),
            form,
            error,
        }
    }
}

/// Product table.
#[instrument(skip(state, admin, page), fields(user_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let products = state
        .backend()
        .privileged()
        .products()
        .list(&ProductFilter::default())
        .await?;

    Ok(ProductsIndexTemplate {
        page,
        products: products.iter().map(ProductRowView::from).collect(),
    })
}

/// Empty product form.
pub async fn new(RequireAdmin(_admin): RequireAdmin, page: PageContext) -> impl IntoResponse {
    ProductFormTemplate::for_new(
        page,
        ProductForm {
            product_sales: "Regular".to_string(),
            quantity_available: "0".to_string(),
            ..ProductForm::default()
        },
        None,
    )
}

/// Create a product with the next free number.
#[instrument(skip(state, session, admin, page, form), fields(user_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let input = match form.to_input() {
        Ok(input) => input,
        Err(message) => {
            return Ok((
                StatusCode::BAD_REQUEST,
                ProductFormTemplate::for_new(page, form, Some(message)),
            )
                .into_response());
        }
    };

    let product = state.backend().privileged().products().create(input).await?;
    Flash::success(format!("Product #{} added.", product.product_no))
        .push(&session)
        .await;
    Ok(Redirect::to("/admin/products").into_response())
}

/// Form prefilled with a product.
#[instrument(skip(state, admin, page), fields(user_id = %admin.id))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
    Path(product_no): Path<ProductNo>,
) -> Result<impl IntoResponse> {
    let product = state
        .backend()
        .privileged()
        .products()
        .get(product_no)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_no}")))?;

    Ok(ProductFormTemplate::for_edit(
        page,
        product_no,
        ProductForm::from(&product),
        None,
    ))
}

/// Overwrite a product's columns.
#[instrument(skip(state, session, admin, page, form), fields(user_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
    Path(product_no): Path<ProductNo>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let input = match form.to_input() {
        Ok(input) => input,
        Err(message) => {
            return Ok((
                StatusCode::BAD_REQUEST,
                ProductFormTemplate::for_edit(page, product_no, form, Some(message)),
            )
                .into_response());
        }
    };

    let updated = state
        .backend()
        .privileged()
        .products()
        .update(product_no, &input)
        .await?;
    if !updated {
        return Err(AppError::NotFound(format!("product {product_no}")));
    }

    Flash::success("The product has been updated successfully.")
        .push(&session)
        .await;
    Ok(Redirect::to("/admin/products").into_response())
}

/// Delete a product.
///
/// Order lines that reference it keep their amounts; the order pages show
/// them without product details.
#[instrument(skip(state, session, admin), fields(user_id = %admin.id))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAdmin(admin): RequireAdmin,
    Path(product_no): Path<ProductNo>,
) -> Result<Redirect> {
    let flash = match state
        .backend()
        .privileged()
        .products()
        .delete(product_no)
        .await
    {
        Ok(true) => Flash::success("The product has been deleted successfully."),
        Ok(false) => Flash::error("That product no longer exists."),
        Err(e) => {
            tracing::error!(error = %e, %product_no, "Failed to delete product");
            Flash::error("Failed to delete product.")
        }
    };
    flash.push(&session).await;
    Ok(Redirect::to("/admin/products"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            p_description: " Desk Lamp ".into(),
            product_price: "24.5".into(),
            quantity_available: "12".into(),
            product_type: "Home".into(),
            product_sales: "Regular".into(),
            p_details: "Warm light.".into(),
            product_image: String::new(),
        }
    }

    #[test]
    fn test_valid_form_becomes_input() {
        let input = form().to_input().unwrap();
        assert_eq!(input.p_description, "Desk Lamp");
        assert_eq!(input.product_price, Price::from_cents(2_450));
        assert_eq!(input.quantity_available, 12);
        assert_eq!(input.product_image, None);
    }

    #[test]
    fn test_invalid_forms_are_reported() {
        let mut missing_name = form();
        missing_name.p_description = "  ".into();
        assert_eq!(missing_name.to_input().unwrap_err(), "Name is required");

        let mut bad_price = form();
        bad_price.product_price = "cheap".into();
        assert!(bad_price.to_input().unwrap_err().starts_with("Price"));

        let mut negative_stock = form();
        negative_stock.quantity_available = "-3".into();
        assert!(negative_stock.to_input().is_err());
    }
}
