//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::backend::OrderWithDetails;
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin};
use crate::routes::orders::format_date;
use crate::state::AppState;

/// Orders listed under "Recent Orders".
const RECENT_ORDER_COUNT: usize = 5;

/// Dashboard metrics, already formatted for display.
#[derive(Debug, Clone)]
pub struct DashboardMetrics {
    pub users: String,
    pub products: String,
    pub orders: String,
    pub revenue: String,
}

impl Default for DashboardMetrics {
    fn default() -> Self {
        Self {
            users: "0".to_string(),
            products: "0".to_string(),
            orders: "0".to_string(),
            revenue: "$0.00".to_string(),
        }
    }
}

/// Recent order view for the dashboard.
#[derive(Debug, Clone)]
pub struct RecentOrderView {
    pub no: i64,
    pub date: String,
    pub items: i64,
    pub amount: String,
    pub status: String,
    pub badge_class: &'static str,
}

impl From<&OrderWithDetails> for RecentOrderView {
    fn from(order: &OrderWithDetails) -> Self {
        Self {
            no: order.order_no.as_i64(),
            date: format_date(order.order_date),
            items: order.item_count(),
            amount: order.subtotal().display(),
            status: order.order_status.to_string(),
            badge_class: order.order_status.badge_class(),
        }
    }
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub page: PageContext,
    pub metrics: DashboardMetrics,
    pub recent_orders: Vec<RecentOrderView>,
    pub allow_self_promote: bool,
}

/// Render a count, or `-` when it could not be loaded.
fn count_or_dash<E: std::fmt::Display>(what: &str, result: Result<u64, E>) -> String {
    match result {
        Ok(count) => count.to_string(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to count {what}");
            "-".to_string()
        }
    }
}

/// Dashboard page handler.
///
/// Each metric is loaded independently; one failing query shows `-` for that
/// card instead of failing the page.
#[instrument(skip(state, admin, page), fields(user_id = %admin.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    page: PageContext,
) -> impl IntoResponse {
    let backend = state.backend().privileged();
    let users = backend.users();
    let products = backend.products();
    let orders = backend.orders();

    let (user_count, product_count, order_count, revenue, recent) = tokio::join!(
        users.count(),
        products.count(),
        orders.count(),
        orders.revenue(),
        orders.recent(RECENT_ORDER_COUNT),
    );

    let metrics = DashboardMetrics {
        users: count_or_dash("users", user_count),
        products: count_or_dash("products", product_count),
        orders: count_or_dash("orders", order_count),
        revenue: match revenue {
            Ok(total) => total.display(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to sum revenue");
                "-".to_string()
            }
        },
    };

    let recent_orders = match recent {
        Ok(orders) => orders.iter().map(RecentOrderView::from).collect(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch recent orders");
            Vec::new()
        }
    };

    DashboardTemplate {
        page,
        metrics,
        recent_orders,
        allow_self_promote: state.config().allow_self_promote,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_order_view_sums_lines() {
        let order: OrderWithDetails = serde_json::from_value(serde_json::json!({
            "order_no": 12,
            "order_date": "2025-03-04",
            "order_status": "Shipped",
            "sales_order_details": [
                {"product_no": 1, "quantity_no": 2, "amt": 99.98},
                {"product_no": 3, "quantity_no": 1, "amt": 129.99}
            ]
        }))
        .unwrap();

        let view = RecentOrderView::from(&order);
        assert_eq!(view.no, 12);
        assert_eq!(view.items, 3);
        assert_eq!(view.amount, "$229.97");
        assert_eq!(view.date, "March 4, 2025");
        assert_eq!(view.badge_class, "badge-shipped");
    }

    #[test]
    fn test_count_or_dash() {
        assert_eq!(count_or_dash::<String>("users", Ok(4)), "4");
        assert_eq!(count_or_dash("users", Err("boom")), "-");
    }
}
