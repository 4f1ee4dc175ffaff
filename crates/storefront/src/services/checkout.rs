//! Checkout: cart to order, line items, and payment.
//!
//! The hosted API cannot wrap several inserts in one transaction, so the rows
//! are written in a fixed order and a failure after the header exists is
//! undone by deleting what was written:
//!
//! 1. resolve the buyer's profile
//! 2. insert the order header under the next free order number
//! 3. insert one line item per cart line
//! 4. insert the payment record
//!
//! Order and payment numbers are `max + 1`. Two concurrent checkouts can race
//! for the same number; the loser sees a unique-key conflict and retries with
//! a fresh number.

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::instrument;

use bazaar_core::{Cart, Email, OrderNo, OrderStatus, OrderTotals, PaymentId, UserId};

use crate::backend::{
    BackendClient, BackendError, OrderDetail, OrderRepository, Payment, SalesOrder,
    ShippingDetails, UserProfile,
};
use crate::models::CurrentUser;

/// Attempts at claiming an order or payment number before giving up.
const MAX_NUMBER_ATTEMPTS: usize = 3;

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to order.
    #[error("cart is empty")]
    EmptyCart,

    /// Another checkout kept claiming the same number.
    #[error("could not allocate a {0} number")]
    NumberUnavailable(&'static str),

    /// Backend request failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Who is paying.
#[derive(Debug, Clone, Copy)]
pub enum Buyer<'a> {
    /// Signed-in user; shipping details are saved to their profile when given.
    SignedIn {
        user: &'a CurrentUser,
        shipping: Option<&'a ShippingDetails>,
    },
    /// Guest identified by email; an existing profile with that email is reused.
    Guest {
        email: &'a Email,
        shipping: &'a ShippingDetails,
    },
}

/// A successfully written order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order_no: OrderNo,
    pub payment_id: PaymentId,
    pub user_id: UserId,
    pub totals: OrderTotals,
}

/// Places orders against the hosted backend.
///
/// Order rows are written with the privileged client: number allocation
/// must see every order, not only the buyer's own, and the buyer's id always
/// comes from the server-side session or profile lookup.
pub struct CheckoutService<'a> {
    backend: &'a BackendClient,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(backend: &'a BackendClient) -> Self {
        Self { backend }
    }

    /// Write the order for `cart`.
    ///
    /// The cart itself is not modified; on success the caller clears it.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` for an empty cart. Any backend
    /// failure after the header was written is returned after the partial
    /// order has been deleted.
    #[instrument(skip(self, buyer, cart), fields(lines = cart.items().len()))]
    pub async fn place_order(
        &self,
        buyer: Buyer<'_>,
        cart: &Cart,
    ) -> Result<PlacedOrder, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let user_id = self.resolve_buyer(buyer).await?;
        let orders = self.backend.privileged().orders();
        let today = Utc::now().date_naive();
        let totals = cart.totals();

        let order_no = insert_header(&orders, user_id, today).await?;

        match write_lines_and_payment(&orders, order_no, user_id, today, cart).await {
            Ok(payment_id) => {
                tracing::info!(
                    order_no = %order_no,
                    payment_id = %payment_id,
                    user_id = %user_id,
                    total = %totals.total,
                    "Order placed"
                );
                Ok(PlacedOrder {
                    order_no,
                    payment_id,
                    user_id,
                    totals,
                })
            }
            Err(e) => {
                compensate(&orders, order_no).await;
                Err(e)
            }
        }
    }

    /// Find or create the profile the order belongs to.
    async fn resolve_buyer(&self, buyer: Buyer<'_>) -> Result<UserId, CheckoutError> {
        match buyer {
            Buyer::SignedIn { user, shipping } => {
                let privileged = self.backend.privileged().users();
                privileged
                    .ensure(user.id, Some(user.name.as_str()), &user.email)
                    .await?;
                if let Some(shipping) = shipping {
                    self.backend
                        .as_user(&user.access_token)
                        .users()
                        .update_shipping(user.id, shipping)
                        .await?;
                }
                Ok(user.id)
            }
            Buyer::Guest { email, shipping } => {
                let users = self.backend.privileged().users();
                if let Some(existing) = users.find_by_email(email).await? {
                    users
                        .update_buyer(existing.user_id, email, shipping)
                        .await?;
                    tracing::debug!(user_id = %existing.user_id, "Guest matched existing profile");
                    return Ok(existing.user_id);
                }

                let user_id = UserId::generate();
                let mut profile = UserProfile::new(user_id, &shipping.user_name, email.as_str());
                profile.user_address.clone_from(&shipping.user_address);
                profile.user_pincode.clone_from(&shipping.user_pincode);
                profile.user_mobile.clone_from(&shipping.user_mobile);
                users.create(&profile).await?;
                tracing::info!(user_id = %user_id, "Guest profile created");
                Ok(user_id)
            }
        }
    }
}

/// Claim the next order number by inserting the header.
async fn insert_header(
    orders: &OrderRepository<'_>,
    user_id: UserId,
    today: NaiveDate,
) -> Result<OrderNo, CheckoutError> {
    for attempt in 1..=MAX_NUMBER_ATTEMPTS {
        let order_no = orders.next_order_no().await?;
        let header = SalesOrder {
            order_no,
            order_date: Some(today),
            user_id: Some(user_id),
            order_status: OrderStatus::Processing,
        };
        match orders.insert_order(&header).await {
            Ok(()) => return Ok(order_no),
            Err(e) if e.is_conflict() => {
                tracing::warn!(attempt, order_no = %order_no, "Order number taken, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(CheckoutError::NumberUnavailable("order"))
}

async fn write_lines_and_payment(
    orders: &OrderRepository<'_>,
    order_no: OrderNo,
    user_id: UserId,
    today: NaiveDate,
    cart: &Cart,
) -> Result<PaymentId, CheckoutError> {
    let details: Vec<OrderDetail> = cart
        .items()
        .iter()
        .map(|item| OrderDetail {
            order_no,
            product_no: item.product_no,
            quantity_no: i64::from(item.quantity),
            amt: item.line_total(),
        })
        .collect();
    orders.insert_details(&details).await?;

    for attempt in 1..=MAX_NUMBER_ATTEMPTS {
        let p_id = orders.next_payment_id().await?;
        let payment = Payment {
            p_id,
            p_date: Some(today),
            p_amt: cart.subtotal(),
            p_details: format!("Payment for order #{order_no}"),
            p_customer_id: Some(user_id),
            order_no: Some(order_no),
        };
        match orders.insert_payment(&payment).await {
            Ok(()) => return Ok(p_id),
            Err(e) if e.is_conflict() => {
                tracing::warn!(attempt, p_id = %p_id, "Payment id taken, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(CheckoutError::NumberUnavailable("payment"))
}

/// Best-effort removal of a partially written order.
async fn compensate(orders: &OrderRepository<'_>, order_no: OrderNo) {
    match orders.delete_order(order_no).await {
        Ok(()) => tracing::warn!(order_no = %order_no, "Partial order rolled back"),
        Err(e) => {
            tracing::error!(order_no = %order_no, error = %e, "Failed to roll back partial order");
        }
    }
}

/// Street address with the city appended (`address, city`).
///
/// The profile has no city column, so the city typed at checkout is kept
/// as part of the address.
#[must_use]
pub fn combine_address(address: &str, city: &str) -> String {
    let address = address.trim();
    let city = city.trim();
    match (address.is_empty(), city.is_empty()) {
        (_, true) => address.to_string(),
        (true, false) => city.to_string(),
        (false, false) => format!("{address}, {city}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_address() {
        assert_eq!(combine_address("12 Main St", "Springfield"), "12 Main St, Springfield");
        assert_eq!(combine_address(" 12 Main St ", ""), "12 Main St");
        assert_eq!(combine_address("", "Springfield"), "Springfield");
    }
}
