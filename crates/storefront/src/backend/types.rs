//! Row types for the hosted database tables.
//!
//! Almost every column is nullable in the hosted schema, so readers go through
//! [`nullable`] and treat `null` as the type's default.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use bazaar_core::{
    Cart, OrderNo, OrderStatus, PaymentId, Price, ProductNo, ProductSnapshot, UserId, UserRole,
    Wishlist,
};

pub use bazaar_core::nullable;

/// Table names.
pub mod tables {
    pub const APP_USER: &str = "app_user";
    pub const PRODUCT_MASTER: &str = "product_master";
    pub const SALES_ORDER: &str = "sales_order";
    pub const SALES_ORDER_DETAILS: &str = "sales_order_details";
    pub const PAYMENT: &str = "payment";
}

// =============================================================================
// product_master
// =============================================================================

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub product_no: ProductNo,
    #[serde(default, deserialize_with = "nullable")]
    pub product_price: Price,
    #[serde(default, deserialize_with = "nullable")]
    pub quantity_available: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub product_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub p_description: String,
    /// Sales label such as `Hot`, `Regular`, or `Seasonal`.
    #[serde(default, deserialize_with = "nullable")]
    pub product_sales: String,
    #[serde(default, deserialize_with = "nullable")]
    pub p_details: String,
    #[serde(default)]
    pub product_image: Option<String>,
}

impl Product {
    /// Whether any units are available.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.quantity_available > 0
    }

    /// The fields copied onto cart and wishlist lines.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            product_no: self.product_no,
            p_description: self.p_description.clone(),
            product_price: self.product_price,
            product_image: self.product_image.clone(),
        }
    }
}

/// Writable product columns (admin form, seeding).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInput {
    pub product_price: Price,
    pub quantity_available: i64,
    pub product_type: String,
    pub p_description: String,
    pub product_sales: String,
    pub p_details: String,
    #[serde(default)]
    pub product_image: Option<String>,
}

impl ProductInput {
    /// Attach a product number for insertion.
    #[must_use]
    pub fn into_product(self, product_no: ProductNo) -> Product {
        Product {
            product_no,
            product_price: self.product_price,
            quantity_available: self.quantity_available,
            product_type: self.product_type,
            p_description: self.p_description,
            product_sales: self.product_sales,
            p_details: self.p_details,
            product_image: self.product_image,
        }
    }
}

// =============================================================================
// app_user
// =============================================================================

/// A user profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    #[serde(default, deserialize_with = "nullable")]
    pub user_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub user_email: String,
    #[serde(default, deserialize_with = "nullable")]
    pub user_address: String,
    #[serde(default, deserialize_with = "nullable")]
    pub user_mobile: String,
    #[serde(default, deserialize_with = "nullable")]
    pub user_pincode: String,
    #[serde(default, deserialize_with = "nullable")]
    pub user_cart: Cart,
    #[serde(default, deserialize_with = "nullable")]
    pub user_wish_list: Wishlist,
    #[serde(default)]
    pub user_role: UserRole,
}

impl UserProfile {
    /// A fresh profile: empty cart and wishlist, customer role.
    #[must_use]
    pub fn new(user_id: UserId, name: &str, email: &str) -> Self {
        Self {
            user_id,
            user_name: name.to_string(),
            user_email: email.to_string(),
            user_address: String::new(),
            user_mobile: String::new(),
            user_pincode: String::new(),
            user_cart: Cart::new(),
            user_wish_list: Wishlist::new(),
            user_role: UserRole::Customer,
        }
    }

    /// Whether the profile has the fields checkout needs.
    #[must_use]
    pub fn has_shipping_details(&self) -> bool {
        !self.user_name.trim().is_empty() && !self.user_address.trim().is_empty()
    }
}

/// Shipping and contact fields collected at checkout and on the profile page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub user_name: String,
    pub user_address: String,
    pub user_pincode: String,
    pub user_mobile: String,
}

/// Email plus shipping details, written when creating or updating a buyer.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct BuyerUpdate<'a> {
    pub user_email: &'a str,
    #[serde(flatten)]
    pub shipping: &'a ShippingDetails,
}

// =============================================================================
// sales_order / sales_order_details / payment
// =============================================================================

/// An order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrder {
    pub order_no: OrderNo,
    #[serde(default)]
    pub order_date: Option<NaiveDate>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub order_status: OrderStatus,
}

/// An order header with its line items and their products embedded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderWithDetails {
    pub order_no: OrderNo,
    #[serde(default)]
    pub order_date: Option<NaiveDate>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub order_status: OrderStatus,
    #[serde(default, deserialize_with = "nullable")]
    pub sales_order_details: Vec<OrderDetailWithProduct>,
}

impl OrderWithDetails {
    /// Sum of line amounts.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.sales_order_details.iter().map(|d| d.amt).sum()
    }

    /// Total units ordered.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.sales_order_details.iter().map(|d| d.quantity_no).sum()
    }
}

/// One order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order_no: OrderNo,
    pub product_no: ProductNo,
    #[serde(default, deserialize_with = "nullable")]
    pub quantity_no: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub amt: Price,
}

/// One order line with its product embedded (the product may have been deleted).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderDetailWithProduct {
    pub product_no: ProductNo,
    #[serde(default, deserialize_with = "nullable")]
    pub quantity_no: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub amt: Price,
    #[serde(default)]
    pub product_master: Option<Product>,
}

/// A payment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub p_id: PaymentId,
    #[serde(default)]
    pub p_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "nullable")]
    pub p_amt: Price,
    #[serde(default, deserialize_with = "nullable")]
    pub p_details: String,
    #[serde(default)]
    pub p_customer_id: Option<UserId>,
    #[serde(default)]
    pub order_no: Option<OrderNo>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_with_null_columns() {
        let json = r#"{
            "user_id": "6c1f0d6e-2a5e-4f7b-9a43-3f7c0a3e9b11",
            "user_name": null,
            "user_email": "shopper@example.com",
            "user_address": null,
            "user_mobile": null,
            "user_pincode": null,
            "user_cart": null,
            "user_wish_list": [],
            "user_role": null
        }"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.user_name, "");
        assert!(profile.user_cart.is_empty());
        assert_eq!(profile.user_role, UserRole::Customer);
        assert!(!profile.has_shipping_details());
    }

    #[test]
    fn test_order_with_embedded_details() {
        let json = r#"{
            "order_no": 12,
            "order_date": "2026-03-01",
            "user_id": null,
            "order_status": "Shipped",
            "sales_order_details": [
                {"order_no": 12, "product_no": 1, "quantity_no": 2, "amt": 1999.98,
                 "product_master": {"product_no": 1, "product_price": 999.99, "p_description": "Premium Laptop"}},
                {"order_no": 12, "product_no": 9, "quantity_no": 1, "amt": 10, "product_master": null}
            ]
        }"#;
        let order: OrderWithDetails = serde_json::from_str(json).unwrap();
        assert_eq!(order.order_status.step(), 2);
        assert_eq!(order.subtotal(), Price::from_cents(200_998));
        assert_eq!(order.item_count(), 3);
        assert!(order.sales_order_details[1].product_master.is_none());
    }

    #[test]
    fn test_product_snapshot() {
        let product: Product = serde_json::from_str(
            r#"{"product_no": 4, "product_price": 79.99, "quantity_available": 0,
                "product_type": "Accessories", "p_description": "Wireless Headphones",
                "product_sales": "Hot", "p_details": null, "product_image": null}"#,
        )
        .unwrap();
        assert!(!product.in_stock());
        let snapshot = product.snapshot();
        assert_eq!(snapshot.product_no, ProductNo::new(4));
        assert_eq!(snapshot.product_price, Price::from_cents(7_999));
    }
}
