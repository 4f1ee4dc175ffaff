//! Order history route handlers (signed-in users only).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::NaiveDate;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::{OrderNo, OrderStatus, OrderTotals, Price};

use crate::backend::{OrderDetailWithProduct, SalesOrder};
use crate::error::Result;
use crate::filters;
use crate::middleware::{PageContext, RequireAuth};
use crate::models::Flash;
use crate::state::AppState;

use super::cart::SummaryView;
use super::signed_in_profile;

/// Labels of the progress tracker, in order.
const STATUS_STEPS: [&str; 3] = ["Processing", "Shipped", "Completed"];

/// Order history row.
#[derive(Debug, Clone)]
pub struct OrderRowView {
    pub no: i64,
    pub date: String,
    pub status: String,
    pub badge_class: &'static str,
}

impl From<&SalesOrder> for OrderRowView {
    fn from(order: &SalesOrder) -> Self {
        Self {
            no: order.order_no.as_i64(),
            date: format_date(order.order_date),
            status: order.order_status.to_string(),
            badge_class: order.order_status.badge_class(),
        }
    }
}

/// One step of the progress tracker.
#[derive(Debug, Clone)]
pub struct StepView {
    pub label: &'static str,
    pub reached: bool,
}

/// Order line display data.
#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub product_no: i64,
    pub name: String,
    pub image: Option<String>,
    pub quantity: i64,
    pub amount: String,
}

impl From<&OrderDetailWithProduct> for OrderLineView {
    fn from(line: &OrderDetailWithProduct) -> Self {
        let product = line.product_master.as_ref();
        Self {
            product_no: line.product_no.as_i64(),
            name: product.map_or_else(
                || format!("Product #{}", line.product_no),
                |p| p.p_description.clone(),
            ),
            image: product
                .and_then(|p| p.product_image.clone())
                .filter(|url| !url.is_empty()),
            quantity: line.quantity_no,
            amount: line.amt.display(),
        }
    }
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub page: PageContext,
    pub orders: Vec<OrderRowView>,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub page: PageContext,
    pub order_no: i64,
    pub placed_on: String,
    pub status: String,
    pub steps: Vec<StepView>,
    pub lines: Vec<OrderLineView>,
    pub summary: SummaryView,
}

/// Long-form date, e.g. `March 4, 2025`.
#[must_use]
pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.format("%B %-d, %Y").to_string())
}

/// Progress tracker for a status.
#[must_use]
pub fn status_steps(status: &OrderStatus) -> Vec<StepView> {
    let reached = status.step();
    (1_u8..)
        .zip(STATUS_STEPS)
        .map(|(step, label)| StepView {
            label,
            reached: step <= reached,
        })
        .collect()
}

/// Order history, newest first.
#[instrument(skip(state, user, page), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: PageContext,
) -> Result<impl IntoResponse> {
    signed_in_profile(&state, &user).await?;
    let orders = state
        .backend()
        .as_user(&user.access_token)
        .orders()
        .list_for_user(user.id)
        .await?;

    Ok(OrdersIndexTemplate {
        page,
        orders: orders.iter().map(OrderRowView::from).collect(),
    })
}

/// One order with status tracker, lines, and totals.
///
/// Orders that do not exist or belong to someone else send the user back to
/// their profile with a notice.
#[instrument(skip(state, session, user, page), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    page: PageContext,
    Path(order_no): Path<i64>,
) -> Result<Response> {
    let order = state
        .backend()
        .as_user(&user.access_token)
        .orders()
        .get_for_user(OrderNo::new(order_no), user.id)
        .await;

    let order = match order {
        Ok(Some(order)) => order,
        Ok(None) => {
            Flash::error("Failed to load order details.").push(&session).await;
            return Ok(Redirect::to("/profile").into_response());
        }
        Err(e) => {
            tracing::error!(order_no, error = %e, "Failed to load order");
            Flash::error("Failed to load order details.").push(&session).await;
            return Ok(Redirect::to("/profile").into_response());
        }
    };

    let subtotal: Price = order.subtotal();
    let item_count = u32::try_from(order.item_count()).unwrap_or(0);

    Ok(OrderShowTemplate {
        page,
        order_no: order.order_no.as_i64(),
        placed_on: format_date(order.order_date),
        status: order.order_status.to_string(),
        steps: status_steps(&order.order_status),
        lines: order
            .sales_order_details
            .iter()
            .map(OrderLineView::from)
            .collect(),
        summary: SummaryView::new(item_count, &OrderTotals::from_subtotal(subtotal)),
    }
    .into_response())
}
