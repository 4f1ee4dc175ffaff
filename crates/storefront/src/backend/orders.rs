//! Order, line item, and payment queries.
//!
//! The hosted API offers no multi-statement transactions, so the checkout
//! service writes these rows one request at a time and uses the delete
//! methods here to undo a partial order.

use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{OrderNo, PaymentId, Price, UserId};

use super::rest::{Query, Rest};
use super::types::{OrderDetail, OrderWithDetails, Payment, SalesOrder, tables};
use super::BackendError;

const ORDER_WITH_DETAILS: &str = "*,sales_order_details(*,product_master(*))";

/// Repository for order operations.
pub struct OrderRepository<'a> {
    rest: Rest<'a>,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(rest: Rest<'a>) -> Self {
        Self { rest }
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<SalesOrder>, BackendError> {
        let query = Query::table(tables::SALES_ORDER)
            .select("order_no,order_date,user_id,order_status")
            .eq("user_id", user_id)
            .order("order_date", false);
        self.rest.fetch(&query).await
    }

    /// One of a user's orders with its line items and products.
    ///
    /// Returns `None` when the order does not exist or belongs to someone else.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self), fields(order_no = %order_no, user_id = %user_id))]
    pub async fn get_for_user(
        &self,
        order_no: OrderNo,
        user_id: UserId,
    ) -> Result<Option<OrderWithDetails>, BackendError> {
        let query = Query::table(tables::SALES_ORDER)
            .select(ORDER_WITH_DETAILS)
            .eq("order_no", order_no)
            .eq("user_id", user_id);
        self.rest.fetch_optional(query).await
    }

    /// Most recent orders across all users (admin dashboard).
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    pub async fn recent(&self, limit: usize) -> Result<Vec<OrderWithDetails>, BackendError> {
        let query = Query::table(tables::SALES_ORDER)
            .select(ORDER_WITH_DETAILS)
            .order("order_no", false)
            .limit(limit);
        self.rest.fetch(&query).await
    }

    /// The number the next order will get (highest + 1, or 1).
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    pub async fn next_order_no(&self) -> Result<OrderNo, BackendError> {
        #[derive(Deserialize)]
        struct Row {
            order_no: OrderNo,
        }

        let query = Query::table(tables::SALES_ORDER)
            .select("order_no")
            .order("order_no", false);
        let max: Option<Row> = self.rest.fetch_optional(query).await?;
        Ok(max.map_or(OrderNo::new(1), |row| row.order_no.next()))
    }

    /// Insert an order header.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Conflict` if the order number is taken.
    #[instrument(skip(self, order), fields(order_no = %order.order_no))]
    pub async fn insert_order(&self, order: &SalesOrder) -> Result<(), BackendError> {
        self.rest.insert(tables::SALES_ORDER, order).await
    }

    /// Insert line items in one request.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self, details), fields(lines = details.len()))]
    pub async fn insert_details(&self, details: &[OrderDetail]) -> Result<(), BackendError> {
        self.rest.insert(tables::SALES_ORDER_DETAILS, details).await
    }

    /// Delete an order's line items and then its header.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if either delete fails.
    #[instrument(skip(self), fields(order_no = %order_no))]
    pub async fn delete_order(&self, order_no: OrderNo) -> Result<(), BackendError> {
        let details = Query::table(tables::SALES_ORDER_DETAILS).eq("order_no", order_no);
        self.rest.delete(&details).await?;
        let header = Query::table(tables::SALES_ORDER).eq("order_no", order_no);
        self.rest.delete(&header).await?;
        Ok(())
    }

    /// The id the next payment will get (highest + 1, or 1).
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    pub async fn next_payment_id(&self) -> Result<PaymentId, BackendError> {
        #[derive(Deserialize)]
        struct Row {
            p_id: PaymentId,
        }

        let query = Query::table(tables::PAYMENT)
            .select("p_id")
            .order("p_id", false);
        let max: Option<Row> = self.rest.fetch_optional(query).await?;
        Ok(max.map_or(PaymentId::new(1), |row| row.p_id.next()))
    }

    /// Insert a payment record.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Conflict` if the payment id is taken.
    #[instrument(skip(self, payment), fields(p_id = %payment.p_id))]
    pub async fn insert_payment(&self, payment: &Payment) -> Result<(), BackendError> {
        self.rest.insert(tables::PAYMENT, payment).await
    }

    /// Number of orders.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    pub async fn count(&self) -> Result<u64, BackendError> {
        self.rest
            .count(&Query::table(tables::SALES_ORDER).select("order_no"))
            .await
    }

    /// Sum of every line amount ever ordered.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    pub async fn revenue(&self) -> Result<Price, BackendError> {
        #[derive(Deserialize)]
        struct Row {
            #[serde(default, deserialize_with = "super::types::nullable")]
            amt: Price,
        }

        let rows: Vec<Row> = self
            .rest
            .fetch(&Query::table(tables::SALES_ORDER_DETAILS).select("amt"))
            .await?;
        Ok(rows.iter().map(|row| row.amt).sum())
    }
}
